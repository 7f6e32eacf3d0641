//! Shard status rows, keyed by region slug.

use rusqlite::{params, Connection};

use super::rows::{json_at, one, text, Fetched, Marker};
use crate::data::Region;
use crate::dto::ShardStatusDto;
use crate::error::Result;

pub fn put_status(conn: &Connection, status: &ShardStatusDto, now: i64) -> Result<()> {
    conn.execute(
        "INSERT INTO shard_status (region, name, slug, hostname, locales, services, last_update)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT (region) DO UPDATE SET
             name = excluded.name,
             slug = excluded.slug,
             hostname = excluded.hostname,
             locales = excluded.locales,
             services = excluded.services,
             last_update = excluded.last_update",
        params![
            status.region.slug(),
            status.name,
            status.slug,
            status.hostname,
            serde_json::to_string(&status.locales)?,
            serde_json::to_string(&status.services)?,
            now,
        ],
    )?;
    Ok(())
}

pub fn get_status(conn: &Connection, region: Region) -> Result<Fetched<ShardStatusDto>> {
    let slug = region.slug();
    let mut stmt = conn.prepare(
        "SELECT name, slug, hostname, locales, services, last_update
         FROM shard_status WHERE region = ?1",
    )?;
    let rows = stmt
        .query_map(params![slug], |row| {
            Ok((
                ShardStatusDto {
                    region,
                    name: row.get(0)?,
                    slug: row.get(1)?,
                    hostname: row.get(2)?,
                    locales: json_at(row, 3)?,
                    services: json_at(row, 4)?,
                },
                row.get::<_, i64>(5)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    let (status, last_update) = one(rows, &format!("ShardStatus {}", slug))?;

    let marker = Marker::new("shard_status", vec![("region", text(&slug))], last_update);
    Ok(Fetched::new(status, vec![marker]))
}
