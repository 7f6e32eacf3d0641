//! Static data DTOs (versions, realms, languages and the data-dragon lists).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::data::Region;

/// One entry of a static data list (a champion, an item, a map...).
///
/// Only the identifying fields are typed; the rest of the entry body is kept
/// as an opaque attribute object.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticEntryDto {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

/// A static data list: champions, items, runes, summoner spells or maps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticDataListDto {
    pub region: Region,
    pub version: String,
    pub locale: String,
    #[serde(default)]
    pub included_data: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_by_id: Option<bool>,
    #[serde(default)]
    pub data: BTreeMap<String, StaticEntryDto>,
}

impl StaticDataListDto {
    pub fn find_by_id(&self, id: i64) -> Option<&StaticEntryDto> {
        self.data.values().find(|entry| entry.id == Some(id))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&StaticEntryDto> {
        self.data
            .values()
            .find(|entry| entry.name.as_deref() == Some(name))
    }
}

/// A single static data entry, returned with the context of the list it was
/// found in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticDataDto {
    pub region: Region,
    pub version: String,
    pub locale: String,
    #[serde(default)]
    pub included_data: BTreeSet<String>,
    #[serde(flatten)]
    pub entry: StaticEntryDto,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionListDto {
    pub region: Region,
    pub versions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealmDto {
    pub region: Region,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguagesDto {
    pub region: Region,
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageStringsDto {
    pub region: Region,
    pub version: String,
    pub locale: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileIconDetailsDto {
    pub id: i64,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileIconDataDto {
    pub region: Region,
    pub version: String,
    pub locale: String,
    #[serde(default)]
    pub data: BTreeMap<String, ProfileIconDetailsDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i64, name: &str) -> StaticEntryDto {
        StaticEntryDto {
            id: Some(id),
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_find_entries() {
        let list = StaticDataListDto {
            region: Region::NorthAmerica,
            version: "13.1.1".to_string(),
            locale: "en_US".to_string(),
            included_data: BTreeSet::from(["all".to_string()]),
            data_by_id: Some(true),
            data: BTreeMap::from([
                ("1".to_string(), entry(1, "Annie")),
                ("2".to_string(), entry(2, "Olaf")),
            ]),
        };
        assert_eq!(list.find_by_id(2).and_then(|e| e.name.clone()).as_deref(), Some("Olaf"));
        assert_eq!(list.find_by_name("Annie").and_then(|e| e.id), Some(1));
        assert!(list.find_by_id(3).is_none());
    }

    #[test]
    fn test_single_entry_flattens() {
        let dto = StaticDataDto {
            region: Region::NorthAmerica,
            version: "13.1.1".to_string(),
            locale: "en_US".to_string(),
            included_data: BTreeSet::new(),
            entry: entry(1, "Annie"),
        };
        let json = serde_json::to_value(&dto).unwrap();
        assert_eq!(json["name"], "Annie");
        assert_eq!(json["region"], "NA");
    }
}
