//! Home, zone and snapshot models

use serde::{Deserialize, Serialize};

/// Aggregated result of one fetch cycle.
///
/// Serializes to the payload the display layer expects:
/// `{ "tadoMe": ..., "tadoHomes": [...] }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Raw `/me` response.
    pub tado_me: serde_json::Value,
    pub tado_homes: Vec<Home>,
}

/// A home with all of its zones, in provider order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Home {
    pub id: u64,
    pub name: String,
    pub zones: Vec<Zone>,
}

/// A zone and its live state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Zone {
    pub id: u64,
    pub name: String,
    #[serde(rename = "type")]
    pub zone_type: String,
    /// Raw `/homes/{id}/zones/{id}/state` response.
    pub state: serde_json::Value,
}

/// Home reference as listed in the `/me` response.
#[derive(Debug, Clone, Deserialize)]
pub struct HomeRef {
    pub id: u64,
    #[serde(default)]
    pub name: String,
}

/// The part of `/me` needed to walk the hierarchy.
#[derive(Debug, Clone, Deserialize)]
pub struct MeHomes {
    #[serde(default)]
    pub homes: Vec<HomeRef>,
}

/// Zone entry from `/homes/{id}/zones`.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneInfo {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub zone_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_snapshot_payload_shape() {
        let snapshot = Snapshot {
            tado_me: json!({"name": "Jo"}),
            tado_homes: vec![Home {
                id: 1,
                name: "Home".to_string(),
                zones: vec![Zone {
                    id: 3,
                    name: "Living".to_string(),
                    zone_type: "HEATING".to_string(),
                    state: json!({"tadoMode": "HOME"}),
                }],
            }],
        };

        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["tadoMe"]["name"], "Jo");
        assert_eq!(value["tadoHomes"][0]["zones"][0]["type"], "HEATING");
        assert_eq!(value["tadoHomes"][0]["zones"][0]["state"]["tadoMode"], "HOME");
    }

    #[test]
    fn test_me_homes_ignores_extra_fields() {
        let me: MeHomes = serde_json::from_value(json!({
            "name": "Jo",
            "email": "jo@example.com",
            "homes": [{"id": 7, "name": "Cabin"}, {"id": 9, "name": "Flat"}]
        }))
        .unwrap();
        let ids: Vec<u64> = me.homes.iter().map(|h| h.id).collect();
        assert_eq!(ids, vec![7, 9]);
    }

    #[test]
    fn test_me_without_homes() {
        let me: MeHomes = serde_json::from_value(json!({"name": "Jo"})).unwrap();
        assert!(me.homes.is_empty());
    }
}
