use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use gateway::{GatewayResult, PackageGateway};
use shared::{
    domain::{
        Allocation, AllocationId, Family, FamilyId, Inventory, InventoryId, ItemId, Package,
        PackageHistory, PackageId, PackageItem, PackageStatus, Role,
    },
    error::GatewayError,
    protocol::{NutritionFacts, PageRequest, SearchResponse},
};

pub fn sample_package(id: &str, status: PackageStatus, item_ids: &[&str]) -> Package {
    Package {
        id: PackageId::new(id),
        package_no: format!("PKG-{id}"),
        status,
        allocation: Allocation {
            id: AllocationId::new("alloc-1"),
            allocation_no: "AL-001".into(),
            window_start: Utc::now(),
            window_end: Utc::now(),
            status: "ACTIVE".into(),
        },
        family: Family {
            id: FamilyId::new("fam-1"),
            family_no: "F-001".into(),
            name: "Tan".into(),
            halal: true,
        },
        created_by: "ops@depot".into(),
        created_at: Utc::now(),
        modified_by: None,
        modified_at: None,
        items: item_ids
            .iter()
            .map(|item_id| PackageItem {
                id: ItemId::new(*item_id),
                inventory: Inventory {
                    id: InventoryId::new(format!("inv-{item_id}")),
                    product_name: "Rice 5kg".into(),
                    storage: "DRY-01".into(),
                    expiry_date: None,
                    quantity: 1,
                    unit: "bag".into(),
                },
            })
            .collect(),
        histories: Vec::new(),
    }
}

#[derive(Default)]
struct TestGatewayState {
    packages: HashMap<PackageId, Package>,
    search_items: Vec<Package>,
    total_record: u64,
    total_page: u32,
    search_error: Option<GatewayError>,
    retrieve_error: Option<GatewayError>,
    command_error: Option<GatewayError>,
    search_calls: usize,
    retrieve_calls: usize,
    pack_calls: usize,
    deliver_calls: usize,
    cancel_calls: usize,
}

/// Scripted in-memory stand-in for the backend, mutated by transition
/// commands the way the real backend would be.
#[derive(Default)]
pub struct TestGateway {
    inner: Mutex<TestGatewayState>,
}

impl TestGateway {
    pub fn with_packages(packages: Vec<Package>) -> Self {
        let gateway = Self::default();
        {
            let mut state = gateway.inner.lock().expect("lock");
            state.total_record = packages.len() as u64;
            state.total_page = 1;
            state.search_items = packages.clone();
            state.packages = packages
                .into_iter()
                .map(|package| (package.id.clone(), package))
                .collect();
        }
        gateway
    }

    pub fn fail_search(&self, err: GatewayError) {
        self.inner.lock().expect("lock").search_error = Some(err);
    }

    pub fn fail_retrieve(&self, err: GatewayError) {
        self.inner.lock().expect("lock").retrieve_error = Some(err);
    }

    pub fn fail_commands(&self, err: GatewayError) {
        self.inner.lock().expect("lock").command_error = Some(err);
    }

    pub fn search_calls(&self) -> usize {
        self.inner.lock().expect("lock").search_calls
    }

    pub fn retrieve_calls(&self) -> usize {
        self.inner.lock().expect("lock").retrieve_calls
    }

    pub fn pack_calls(&self) -> usize {
        self.inner.lock().expect("lock").pack_calls
    }

    pub fn deliver_calls(&self) -> usize {
        self.inner.lock().expect("lock").deliver_calls
    }

    pub fn cancel_calls(&self) -> usize {
        self.inner.lock().expect("lock").cancel_calls
    }

    fn transition(
        &self,
        id: &PackageId,
        next: PackageStatus,
        cancel_reason: Option<&str>,
    ) -> GatewayResult<()> {
        let mut state = self.inner.lock().expect("lock");
        if let Some(err) = &state.command_error {
            return Err(err.clone());
        }
        let package = state
            .packages
            .get_mut(id)
            .ok_or_else(|| GatewayError::Rejected {
                messages: vec!["package not found".into()],
            })?;
        package.status = next;
        package.histories.push(PackageHistory {
            action: next,
            actor: "ops@depot".into(),
            at: Utc::now(),
            cancel_reason: cancel_reason.map(str::to_string),
        });
        let updated = package.clone();
        for item in &mut state.search_items {
            if item.id == updated.id {
                *item = updated.clone();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PackageGateway for TestGateway {
    async fn search(
        &self,
        _filters: &BTreeMap<String, String>,
        _page: &PageRequest,
    ) -> GatewayResult<SearchResponse> {
        let mut state = self.inner.lock().expect("lock");
        state.search_calls += 1;
        if let Some(err) = &state.search_error {
            return Err(err.clone());
        }
        Ok(SearchResponse {
            items: state.search_items.clone(),
            total_record: state.total_record,
            total_page: state.total_page,
        })
    }

    async fn retrieve(&self, id: &PackageId) -> GatewayResult<Package> {
        let mut state = self.inner.lock().expect("lock");
        state.retrieve_calls += 1;
        if let Some(err) = &state.retrieve_error {
            return Err(err.clone());
        }
        state
            .packages
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::Rejected {
                messages: vec!["package not found".into()],
            })
    }

    async fn pack(&self, id: &PackageId) -> GatewayResult<()> {
        self.inner.lock().expect("lock").pack_calls += 1;
        self.transition(id, PackageStatus::Packed, None)
    }

    async fn deliver(&self, id: &PackageId) -> GatewayResult<()> {
        self.inner.lock().expect("lock").deliver_calls += 1;
        self.transition(id, PackageStatus::Delivered, None)
    }

    async fn cancel(&self, id: &PackageId, reason: &str) -> GatewayResult<()> {
        self.inner.lock().expect("lock").cancel_calls += 1;
        self.transition(id, PackageStatus::Cancelled, Some(reason))
    }

    async fn extract_nutrition(&self, _image: &[u8]) -> GatewayResult<NutritionFacts> {
        Ok(NutritionFacts {
            serving_size: None,
            calories: None,
            nutrients: Vec::new(),
        })
    }

    async fn user_role(&self) -> GatewayResult<Role> {
        Ok(Role::Staff)
    }
}
