use shared::domain::PackageStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Neutral,
    Active,
    Positive,
    Destructive,
}

/// Rendering descriptor for a status chip. The mapping is an exhaustive
/// match on the closed status enum, so adding a status without a badge
/// fails to compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBadge {
    pub label: &'static str,
    pub icon: &'static str,
    pub tone: Tone,
}

pub fn status_badge(status: PackageStatus) -> StatusBadge {
    match status {
        PackageStatus::New => StatusBadge {
            label: "New",
            icon: "inventory_2",
            tone: Tone::Neutral,
        },
        PackageStatus::Packed => StatusBadge {
            label: "Packed",
            icon: "local_shipping",
            tone: Tone::Active,
        },
        PackageStatus::Delivered => StatusBadge {
            label: "Delivered",
            icon: "check_circle",
            tone: Tone::Positive,
        },
        PackageStatus::Cancelled => StatusBadge {
            label: "Cancelled",
            icon: "cancel",
            tone: Tone::Destructive,
        },
    }
}
