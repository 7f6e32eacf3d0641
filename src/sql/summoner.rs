//! Summoner rows.

use rusqlite::{params, Connection, Row};

use super::rows::{first, one, platform_at, text, Fetched, Marker};
use crate::data::Platform;
use crate::disk::keys::SummonerField;
use crate::dto::{normalize_name, SummonerDto};
use crate::error::Result;

const COLUMNS: &str = "platform, id, account_id, puuid, name, summoner_level, profile_icon_id, \
                       revision_date, last_update";

pub fn put(conn: &Connection, summoner: &SummonerDto, now: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO summoner (platform, id, account_id, puuid, name, normalized_name,
                               summoner_level, profile_icon_id, revision_date, last_update)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
         ON CONFLICT (platform, id) DO UPDATE SET
             account_id = excluded.account_id,
             puuid = excluded.puuid,
             name = excluded.name,
             normalized_name = excluded.normalized_name,
             summoner_level = excluded.summoner_level,
             profile_icon_id = excluded.profile_icon_id,
             revision_date = excluded.revision_date,
             last_update = excluded.last_update",
        params![
            summoner.platform.as_str(),
            summoner.id,
            summoner.account_id,
            summoner.puuid,
            summoner.name,
            summoner.normalized_name(),
            summoner.summoner_level,
            summoner.profile_icon_id,
            summoner.revision_date,
            now,
        ],
    )?;
    Ok(())
}

/// Ids are exactly-one lookups; names are not unique and take the first row.
pub fn get(conn: &Connection, platform: Platform, field: &SummonerField) -> Result<Fetched<SummonerDto>> {
    let (column, value) = match field {
        SummonerField::Id(id) => ("id", id.clone()),
        SummonerField::AccountId(account_id) => ("account_id", account_id.clone()),
        SummonerField::Puuid(puuid) => ("puuid", puuid.clone()),
        SummonerField::Name(name) => ("normalized_name", normalize_name(name)),
    };
    let sql = format!(
        "SELECT {} FROM summoner WHERE platform = ?1 AND {} = ?2 ORDER BY rowid",
        COLUMNS, column
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![platform.as_str(), value], read_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let what = format!("Summoner {} {}={}", platform, column, value);
    let (summoner, last_update) = match field {
        SummonerField::Name(_) => first(rows, &what)?,
        _ => one(rows, &what)?,
    };
    let marker = Marker::new(
        "summoner",
        vec![("platform", text(platform.as_str())), ("id", text(&summoner.id))],
        last_update,
    );
    Ok(Fetched::new(summoner, vec![marker]))
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<(SummonerDto, i64)> {
    Ok((
        SummonerDto {
            platform: platform_at(row, 0)?,
            id: row.get(1)?,
            account_id: row.get(2)?,
            puuid: row.get(3)?,
            name: row.get(4)?,
            summoner_level: row.get(5)?,
            profile_icon_id: row.get(6)?,
            revision_date: row.get(7)?,
        },
        row.get(8)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::schema;

    fn summoner(id: &str, name: &str) -> SummonerDto {
        SummonerDto {
            platform: Platform::Na1,
            id: id.to_string(),
            account_id: format!("acc-{}", id),
            puuid: format!("puuid-{}", id),
            name: name.to_string(),
            summoner_level: 30,
            profile_icon_id: 7,
            revision_date: 1_500_000_000_000,
        }
    }

    #[test]
    fn test_lookup_by_each_field() {
        let conn = Connection::open_in_memory().unwrap();
        schema::create(&conn).unwrap();
        let stored = summoner("abc123", "Foo Bar");
        put(&conn, &stored, 10).unwrap();

        for field in [
            SummonerField::Id("abc123".into()),
            SummonerField::AccountId("acc-abc123".into()),
            SummonerField::Puuid("puuid-abc123".into()),
            SummonerField::Name("foo bar".into()),
        ] {
            let fetched = get(&conn, Platform::Na1, &field).unwrap();
            assert_eq!(fetched.value, stored);
            assert_eq!(fetched.markers[0].last_update, 10);
        }
    }

    #[test]
    fn test_upsert_refreshes_row() {
        let conn = Connection::open_in_memory().unwrap();
        schema::create(&conn).unwrap();
        put(&conn, &summoner("abc123", "Foo Bar"), 10).unwrap();
        put(&conn, &summoner("abc123", "Renamed"), 20).unwrap();

        let fetched = get(&conn, Platform::Na1, &SummonerField::Id("abc123".into())).unwrap();
        assert_eq!(fetched.value.name, "Renamed");
        assert_eq!(fetched.markers[0].last_update, 20);
        assert!(get(&conn, Platform::Na1, &SummonerField::Name("Foo Bar".into()))
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_name_lookup_takes_first_match() {
        let conn = Connection::open_in_memory().unwrap();
        schema::create(&conn).unwrap();
        put(&conn, &summoner("one", "Same Name"), 10).unwrap();
        put(&conn, &summoner("two", "samename"), 10).unwrap();

        let fetched = get(&conn, Platform::Na1, &SummonerField::Name("SAME NAME".into())).unwrap();
        assert_eq!(fetched.value.id, "one");
    }

    #[test]
    fn test_other_platform_misses() {
        let conn = Connection::open_in_memory().unwrap();
        schema::create(&conn).unwrap();
        put(&conn, &summoner("abc123", "Foo Bar"), 10).unwrap();
        assert!(get(&conn, Platform::Euw1, &SummonerField::Id("abc123".into()))
            .unwrap_err()
            .is_not_found());
    }
}
