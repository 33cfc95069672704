use serde::Serialize;

use karat_core::ConnectionParams;

pub const FALLBACK_SHOP_NAME: &str = "Jewellery Shop";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    pub shop_name: String,
    pub project_id: String,
}

/// Landing view after login. Reads only the session, never the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardService;

impl DashboardService {
    pub fn view(&self, params: &ConnectionParams) -> DashboardView {
        let name = params.shop_name.trim();
        DashboardView {
            shop_name: if name.is_empty() {
                FALLBACK_SHOP_NAME.to_string()
            } else {
                name.to_string()
            },
            project_id: params.project_id.clone(),
        }
    }
}
