use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::IntentId;
use crate::error::{BrokerError, Result};

/// Topic subscriptions a connection can join: one intent, one capability
/// prefix, all providers, or the aggregate dashboard feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomId {
    Intent(IntentId),
    Capability(String),
    Providers,
    Dashboard,
}

impl RoomId {
    pub fn as_key(&self) -> String {
        match self {
            RoomId::Intent(id) => format!("intent:{id}"),
            RoomId::Capability(cap) => format!("capability:{cap}"),
            RoomId::Providers => "providers".to_string(),
            RoomId::Dashboard => "dashboard".to_string(),
        }
    }

    /// Parse the wire room key a subscriber sends in a `subscribe`/`unsubscribe`
    /// control message back into a `RoomId`.
    pub fn parse(key: &str) -> Result<RoomId> {
        match key {
            "providers" => Ok(RoomId::Providers),
            "dashboard" => Ok(RoomId::Dashboard),
            other => {
                if let Some(rest) = other.strip_prefix("intent:") {
                    let uuid: uuid::Uuid = rest
                        .parse()
                        .map_err(|_| BrokerError::validation(format!("invalid room '{other}'")))?;
                    Ok(RoomId::Intent(IntentId(uuid)))
                } else if let Some(cap) = other.strip_prefix("capability:") {
                    Ok(RoomId::Capability(cap.to_string()))
                } else {
                    Err(BrokerError::validation(format!("invalid room '{other}'")))
                }
            }
        }
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_through_as_key() {
        let id = IntentId::new();
        for room in [
            RoomId::Intent(id),
            RoomId::Capability("weather".to_string()),
            RoomId::Providers,
            RoomId::Dashboard,
        ] {
            assert_eq!(RoomId::parse(&room.as_key()).unwrap(), room);
        }
    }

    #[test]
    fn parse_rejects_unknown_room() {
        assert!(RoomId::parse("nonsense").is_err());
    }
}
