//! Fleet resource model.
//!
//! Only the parts of the fleet definition the syncer reads are modelled. The
//! container image lives four templates deep:
//! `spec.template.spec.template.spec.containers[0].image`.

use serde::{de, Deserialize, Deserializer, Serialize};

use crate::error::SyncError;

/// Resource kind carried by fleet objects.
pub const FLEET_KIND: &str = "Fleet";

/// A replicated game server workload group.
///
/// `metadata`, `spec` and the template chain down to the pod template are
/// required, and `kind` must be `Fleet` when present, so that other resources
/// (a GameServer, a GameServerSet) never deserialize as a fleet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fleet {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "fleet_kind"
    )]
    pub kind: Option<String>,
    pub metadata: ObjectMeta,
    pub spec: FleetSpec,
}

fn fleet_kind<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let kind = Option::<String>::deserialize(deserializer)?;
    match kind.as_deref() {
        None | Some(FLEET_KIND) => Ok(kind),
        Some(other) => Err(de::Error::custom(format!(
            "expected kind {}, found {}",
            FLEET_KIND, other
        ))),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    pub template: GameServerTemplateSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameServerTemplateSpec {
    pub spec: GameServerSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameServerSpec {
    pub template: PodTemplateSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodTemplateSpec {
    #[serde(default)]
    pub spec: PodSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
}

impl Fleet {
    /// Build a fleet whose template runs a single container with `image`.
    pub fn new(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            kind: Some(FLEET_KIND.to_owned()),
            metadata: ObjectMeta {
                name: name.into(),
                namespace: None,
            },
            spec: FleetSpec {
                replicas: None,
                template: GameServerTemplateSpec {
                    spec: GameServerSpec {
                        template: PodTemplateSpec {
                            spec: PodSpec {
                                containers: vec![Container {
                                    name: "gameserver".to_owned(),
                                    image: image.into(),
                                }],
                            },
                        },
                    },
                },
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// Containers declared by the game server pod template.
    pub fn containers(&self) -> &[Container] {
        &self.spec.template.spec.template.spec.containers
    }

    /// Image of the first container slot, if set.
    pub fn required_image(&self) -> Option<&str> {
        self.containers()
            .first()
            .map(|c| c.image.as_str())
            .filter(|image| !image.is_empty())
    }
}

/// Projection of a fleet onto what the syncer acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FleetSnapshot {
    pub name: String,
    pub required_image: String,
}

impl FleetSnapshot {
    /// Project `fleet`; a template without a resolvable image is rejected.
    pub fn from_fleet(fleet: &Fleet) -> Result<Self, SyncError> {
        let image = fleet
            .required_image()
            .ok_or_else(|| SyncError::MissingImage {
                fleet: fleet.name().to_owned(),
            })?;

        Ok(Self {
            name: fleet.name().to_owned(),
            required_image: image.to_owned(),
        })
    }
}
