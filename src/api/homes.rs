//! tado resource hierarchy: user, homes, zones, zone state

use super::client::TadoClient;
use crate::error::FetchError;
use crate::models::{Home, MeHomes, Snapshot, Zone, ZoneInfo};

/// Walk `/me` → homes → zones → zone state and build a snapshot.
///
/// Requests are issued one after another in provider order. The first
/// failure aborts the walk; no partial snapshot is ever returned.
pub async fn fetch_snapshot_data(
    client: &TadoClient,
    access_token: &str,
) -> Result<Snapshot, FetchError> {
    let me: serde_json::Value = client.get_json("/me", access_token).await?;
    let me_homes: MeHomes = serde_json::from_value(me.clone()).map_err(|e| {
        FetchError::transport(
            &format!("{}/me", client.base_url()),
            format!("unexpected /me shape: {}", e),
        )
    })?;

    let mut homes = Vec::with_capacity(me_homes.homes.len());

    for home in me_homes.homes {
        tracing::debug!("Fetching zones for home {} ({})", home.name, home.id);

        let zone_list: Vec<ZoneInfo> = client
            .get_json(&format!("/homes/{}/zones", home.id), access_token)
            .await?;

        let mut zones = Vec::with_capacity(zone_list.len());
        for zone in zone_list {
            let state: serde_json::Value = client
                .get_json(
                    &format!("/homes/{}/zones/{}/state", home.id, zone.id),
                    access_token,
                )
                .await?;

            zones.push(Zone {
                id: zone.id,
                name: zone.name,
                zone_type: zone.zone_type,
                state,
            });
        }

        homes.push(Home {
            id: home.id,
            name: home.name,
            zones,
        });
    }

    Ok(Snapshot {
        tado_me: me,
        tado_homes: homes,
    })
}
