use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(PackageId);
id_newtype!(AllocationId);
id_newtype!(FamilyId);
id_newtype!(ItemId);
id_newtype!(InventoryId);

/// Lifecycle status of a package. Transitions are monotonic along
/// NEW -> PACKED -> DELIVERED, with CANCELLED reachable from NEW or PACKED
/// only. The backend is the authority; client-side checks are convenience.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackageStatus {
    New,
    Packed,
    Delivered,
    Cancelled,
}

impl PackageStatus {
    pub fn may_pack(self) -> bool {
        self == PackageStatus::New
    }

    pub fn may_deliver(self) -> bool {
        self == PackageStatus::Packed
    }

    pub fn may_cancel(self) -> bool {
        matches!(self, PackageStatus::New | PackageStatus::Packed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Staff,
    Viewer,
}

impl Role {
    /// Whether the role may issue pack/deliver/cancel commands at all.
    pub fn can_transition(self) -> bool {
        !matches!(self, Role::Viewer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: AllocationId,
    pub allocation_no: String,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Family {
    pub id: FamilyId,
    pub family_no: String,
    pub name: String,
    pub halal: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub id: InventoryId,
    pub product_name: String,
    pub storage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,
    pub quantity: u32,
    pub unit: String,
}

/// A line of a package. Read-only from the client's perspective except for
/// the pack-time selection, which is held by the detail controller and never
/// written back through this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageItem {
    pub id: ItemId,
    pub inventory: Inventory,
}

/// Append-only audit entry, one per status change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageHistory {
    pub action: PackageStatus,
    pub actor: String,
    pub at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub package_no: String,
    pub status: PackageStatus,
    pub allocation: Allocation,
    pub family: Family,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
    pub items: Vec<PackageItem>,
    pub histories: Vec<PackageHistory>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_in_backend_vocabulary() {
        assert_eq!(
            serde_json::to_string(&PackageStatus::Packed).expect("json"),
            "\"PACKED\""
        );
        assert_eq!(
            serde_json::from_str::<PackageStatus>("\"CANCELLED\"").expect("json"),
            PackageStatus::Cancelled
        );
    }

    #[test]
    fn cancel_is_reachable_from_new_and_packed_only() {
        assert!(PackageStatus::New.may_cancel());
        assert!(PackageStatus::Packed.may_cancel());
        assert!(!PackageStatus::Delivered.may_cancel());
        assert!(!PackageStatus::Cancelled.may_cancel());
    }

    #[test]
    fn viewer_role_cannot_transition() {
        assert!(Role::Admin.can_transition());
        assert!(Role::Staff.can_transition());
        assert!(!Role::Viewer.can_transition());
    }
}
