//! Feature services of the shop console.
//!
//! Every service works against the tenant bound in the
//! [`TenantConnectionRegistry`]. None of them resolve a tenant on their
//! own: before login they fail with `TenantNotInitialized`.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use karat_core::store::{DocumentStore, StoreError};
use karat_core::{Clock, KaratError, TenantConnectionRegistry};

pub mod categories;
pub mod dashboard;
pub mod image;
pub mod investments;
pub mod partners;
pub mod plans;
pub mod products;
pub mod rates;
pub mod schema;
pub mod users;

pub use categories::{CategoriesService, Category, CategoryInput};
pub use dashboard::{DashboardService, DashboardView};
pub use image::ImageOptions;
pub use investments::{Investment, InvestmentsService, PaymentEntry};
pub use partners::{EarningEntry, EarningInput, Partner, PartnersService};
pub use plans::{InvestmentPlan, PlanInput, PlansService};
pub use products::{Product, ProductInput, ProductsService};
pub use rates::{MetalRates, RatesPatch, RatesService};
pub use users::{User, UserProfile, UsersService};

/// Shared plumbing for the services: tenant lookup and time.
#[derive(Clone)]
pub struct Scope {
    registry: Arc<TenantConnectionRegistry>,
    clock: Arc<dyn Clock>,
}

impl Scope {
    pub fn new(registry: Arc<TenantConnectionRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self { registry, clock }
    }

    /// The bound tenant store.
    pub(crate) fn store(&self) -> anyhow::Result<Arc<dyn DocumentStore>> {
        let handle = self.registry.require().map_err(remote)?;
        Ok(Arc::clone(handle.store()))
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub(crate) fn timestamp(&self) -> String {
        self.now().to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

pub(crate) fn remote(err: StoreError) -> anyhow::Error {
    KaratError::from(err).into_anyhow()
}

/// All feature services, built once at startup.
#[derive(Clone)]
pub struct Catalog {
    pub categories: CategoriesService,
    pub products: ProductsService,
    pub plans: PlansService,
    pub investments: InvestmentsService,
    pub partners: PartnersService,
    pub rates: RatesService,
    pub users: UsersService,
    pub dashboard: DashboardService,
}

impl Catalog {
    pub fn new(scope: Scope, images: ImageOptions) -> Self {
        Self {
            categories: CategoriesService::new(scope.clone(), images.clone()),
            products: ProductsService::new(scope.clone(), images),
            plans: PlansService::new(scope.clone()),
            investments: InvestmentsService::new(scope.clone()),
            partners: PartnersService::new(scope.clone()),
            rates: RatesService::new(scope.clone()),
            users: UsersService::new(scope),
            dashboard: DashboardService,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::Cursor;
    use std::sync::Arc;

    use base64::{engine::general_purpose, Engine as _};
    use chrono::{TimeZone, Utc};
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use karat_core::{
        Clock, ConnectionParams, ManualClock, MemoryConnector, MemoryStore, TenantConnectionRegistry,
    };

    use crate::Scope;

    pub struct Fixture {
        pub store: Arc<MemoryStore>,
        pub clock: Arc<ManualClock>,
        pub scope: Scope,
    }

    impl Fixture {
        pub fn clock_millis(&self) -> i64 {
            self.clock.now().timestamp_millis()
        }
    }

    /// A scope bound to an in-memory tenant `p1`.
    pub fn bound() -> Fixture {
        let connector = Arc::new(MemoryConnector::new());
        let registry = Arc::new(TenantConnectionRegistry::new(connector.clone()));
        registry
            .resolve(&ConnectionParams::new("k1", "p1"))
            .unwrap();
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 15, 10, 30, 0).unwrap()));
        Fixture {
            store: connector.store("p1"),
            scope: Scope::new(registry, clock.clone()),
            clock,
        }
    }

    /// A solid PNG of the given size, base64-encoded.
    pub fn png_base64(width: u32, height: u32) -> String {
        let img = RgbImage::from_pixel(width, height, Rgb([212, 175, 55]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        general_purpose::STANDARD.encode(out.into_inner())
    }

    /// A scope with nothing bound yet.
    pub fn unbound() -> Scope {
        let registry = Arc::new(TenantConnectionRegistry::new(Arc::new(MemoryConnector::new())));
        Scope::new(registry, Arc::new(ManualClock::new(Utc::now())))
    }
}
