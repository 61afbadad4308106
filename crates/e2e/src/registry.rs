//! Entity registry
//!
//! Lazily constructs and memoizes one instance per entity name. UI entities
//! are bound to the scenario's page, API entities to its HTTP session. A
//! resolved entity keeps its identity until the registry is reset.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::api::{ApiService, BrandService, CategoryService, ProductService};
use crate::browser::PageHandle;
use crate::error::{E2eError, E2eResult};
use crate::http::HttpSession;
use crate::pages::{AccountLoginPage, CartPage, HomePage, PageObject, ProductPage};

type Instance = Arc<dyn Any + Send + Sync>;
type Constructor = Box<dyn Fn(&SessionBindings) -> E2eResult<Instance> + Send + Sync>;

/// Something the registry can hand out under a stable name
pub trait Entity: Send + Sync + 'static {
    const NAME: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityScope {
    /// Bound to the page
    Ui,
    /// Bound to the HTTP session
    Api,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetScope {
    /// Drop page-bound entities only
    Ui,
    /// Drop everything
    All,
}

/// Session resources available when the registry was built
#[derive(Clone, Default)]
pub struct SessionBindings {
    pub page: Option<PageHandle>,
    pub http: Option<Arc<HttpSession>>,
    pub base_url: String,
}

impl SessionBindings {
    fn page_for(&self, entity: &str) -> E2eResult<PageHandle> {
        self.page
            .clone()
            .ok_or_else(|| E2eError::ResourceNotInitialized {
                entity: entity.to_string(),
                dependency: "Page",
            })
    }

    fn http_for(&self, entity: &str) -> E2eResult<Arc<HttpSession>> {
        self.http
            .clone()
            .ok_or_else(|| E2eError::ResourceNotInitialized {
                entity: entity.to_string(),
                dependency: "HttpSession",
            })
    }
}

struct Registration {
    scope: EntityScope,
    construct: Constructor,
}

pub struct EntityRegistry {
    bindings: SessionBindings,
    registrations: HashMap<&'static str, Registration>,
    cache: Mutex<HashMap<&'static str, Instance>>,
}

impl EntityRegistry {
    /// Registry with the standard Toolshop pages and services registered
    pub fn new(bindings: SessionBindings) -> Self {
        let mut registry = Self::empty(bindings);
        registry.register_ui::<HomePage>();
        registry.register_ui::<ProductPage>();
        registry.register_ui::<CartPage>();
        registry.register_ui::<AccountLoginPage>();
        registry.register_api::<ProductService>();
        registry.register_api::<BrandService>();
        registry.register_api::<CategoryService>();
        registry
    }

    pub fn empty(bindings: SessionBindings) -> Self {
        Self {
            bindings,
            registrations: HashMap::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn register_ui<T: PageObject>(&mut self) {
        self.register(T::NAME, EntityScope::Ui, |bindings| {
            let page = bindings.page_for(T::NAME)?;
            Ok(Arc::new(T::new(page, &bindings.base_url)) as Instance)
        });
    }

    pub fn register_api<T: ApiService>(&mut self) {
        self.register(T::NAME, EntityScope::Api, |bindings| {
            let session = bindings.http_for(T::NAME)?;
            Ok(Arc::new(T::new(session)) as Instance)
        });
    }

    /// Register a custom constructor. Re-registering a name replaces the
    /// constructor and drops any cached instance for it.
    pub fn register<F>(&mut self, name: &'static str, scope: EntityScope, construct: F)
    where
        F: Fn(&SessionBindings) -> E2eResult<Instance> + Send + Sync + 'static,
    {
        self.cache.lock().remove(name);
        self.registrations.insert(
            name,
            Registration {
                scope,
                construct: Box::new(construct),
            },
        );
    }

    /// Resolve an entity by its registered name
    pub fn resolve<T: Entity>(&self) -> E2eResult<Arc<T>> {
        self.resolve_named(T::NAME)?
            .downcast::<T>()
            .map_err(|_| {
                E2eError::NoSuchEntity(format!(
                    "'{}' is registered with a different type",
                    T::NAME
                ))
            })
    }

    /// Resolve by name without knowing the concrete type
    pub fn resolve_named(&self, name: &str) -> E2eResult<Instance> {
        let (key, registration) = self
            .registrations
            .get_key_value(name)
            .ok_or_else(|| E2eError::NoSuchEntity(name.to_string()))?;

        let mut cache = self.cache.lock();
        if let Some(instance) = cache.get(key) {
            return Ok(Arc::clone(instance));
        }

        let instance = (registration.construct)(&self.bindings)?;
        debug!("Constructed entity '{}'", name);
        cache.insert(*key, Arc::clone(&instance));
        Ok(instance)
    }

    /// Discard memoized instances so the next resolve constructs afresh
    pub fn reset(&self, scope: ResetScope) {
        let mut cache = self.cache.lock();
        match scope {
            ResetScope::All => cache.clear(),
            ResetScope::Ui => cache.retain(|name, _| {
                self.registrations
                    .get(name)
                    .is_some_and(|r| r.scope != EntityScope::Ui)
            }),
        }
        debug!("Reset {:?} entities", scope);
    }

    pub fn is_cached(&self, name: &str) -> bool {
        self.cache.lock().contains_key(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.registrations.contains_key(name)
    }

    pub fn page(&self) -> E2eResult<PageHandle> {
        self.bindings.page_for("page")
    }

    pub fn http_session(&self) -> E2eResult<Arc<HttpSession>> {
        self.bindings.http_for("http session")
    }

    pub fn base_url(&self) -> &str {
        &self.bindings.base_url
    }

    pub fn home_page(&self) -> E2eResult<Arc<HomePage>> {
        self.resolve()
    }

    pub fn product_page(&self) -> E2eResult<Arc<ProductPage>> {
        self.resolve()
    }

    pub fn cart_page(&self) -> E2eResult<Arc<CartPage>> {
        self.resolve()
    }

    pub fn account_login_page(&self) -> E2eResult<Arc<AccountLoginPage>> {
        self.resolve()
    }

    pub fn product_service(&self) -> E2eResult<Arc<ProductService>> {
        self.resolve()
    }

    pub fn brand_service(&self) -> E2eResult<Arc<BrandService>> {
        self.resolve()
    }

    pub fn category_service(&self) -> E2eResult<Arc<CategoryService>> {
        self.resolve()
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut registered: Vec<_> = self.registrations.keys().copied().collect();
        registered.sort_unstable();
        let mut cached: Vec<_> = self.cache.lock().keys().copied().collect();
        cached.sort_unstable();
        f.debug_struct("EntityRegistry")
            .field("registered", &registered)
            .field("cached", &cached)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Page;
    use async_trait::async_trait;
    use std::time::Duration;

    struct BlankPage;

    #[async_trait]
    impl Page for BlankPage {
        async fn goto(&self, _url: &str) -> E2eResult<()> {
            Ok(())
        }
        async fn click(&self, _selector: &str) -> E2eResult<()> {
            Ok(())
        }
        async fn fill(&self, _selector: &str, _value: &str) -> E2eResult<()> {
            Ok(())
        }
        async fn press(&self, _selector: &str, _key: &str) -> E2eResult<()> {
            Ok(())
        }
        async fn text_content(&self, _selector: &str) -> E2eResult<Option<String>> {
            Ok(None)
        }
        async fn all_text_contents(&self, _selector: &str) -> E2eResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn is_visible(&self, _selector: &str) -> E2eResult<bool> {
            Ok(false)
        }
        async fn count(&self, _selector: &str) -> E2eResult<usize> {
            Ok(0)
        }
        async fn wait_for(&self, _selector: &str, _timeout: Duration) -> E2eResult<()> {
            Ok(())
        }
        async fn url(&self) -> E2eResult<String> {
            Ok("about:blank".to_string())
        }
        async fn screenshot(&self, _full_page: bool) -> E2eResult<Vec<u8>> {
            Ok(Vec::new())
        }
        async fn close(&self) -> E2eResult<()> {
            Ok(())
        }
        fn is_closed(&self) -> bool {
            false
        }
    }

    fn ui_only() -> EntityRegistry {
        EntityRegistry::new(SessionBindings {
            page: Some(Arc::new(BlankPage)),
            http: None,
            base_url: "https://toolshop.test".to_string(),
        })
    }

    fn full() -> EntityRegistry {
        let http = HttpSession::open("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();
        EntityRegistry::new(SessionBindings {
            page: Some(Arc::new(BlankPage)),
            http: Some(Arc::new(http)),
            base_url: "https://toolshop.test".to_string(),
        })
    }

    #[test]
    fn test_resolve_twice_returns_same_instance() {
        let registry = full();
        let first = registry.home_page().unwrap();
        let second = registry.home_page().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let a = registry.product_service().unwrap();
        let b = registry.resolve::<ProductService>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_construction_is_lazy() {
        let registry = full();
        assert!(registry.is_registered(HomePage::NAME));
        assert!(!registry.is_cached(HomePage::NAME));
        registry.home_page().unwrap();
        assert!(registry.is_cached(HomePage::NAME));
        assert!(!registry.is_cached(CartPage::NAME));
    }

    #[test]
    fn test_api_entity_without_session_fails() {
        let registry = ui_only();
        match registry.product_service() {
            Err(E2eError::ResourceNotInitialized { entity, dependency }) => {
                assert_eq!(entity, ProductService::NAME);
                assert_eq!(dependency, "HttpSession");
            }
            other => panic!("expected ResourceNotInitialized, got {:?}", other.map(|_| ())),
        }
        assert!(!registry.is_cached(ProductService::NAME));
        assert!(registry.home_page().is_ok());
    }

    #[test]
    fn test_unknown_name_fails() {
        let registry = full();
        let err = registry.resolve_named("checkout wizard").err().unwrap();
        assert!(matches!(err, E2eError::NoSuchEntity(name) if name == "checkout wizard"));
    }

    #[test]
    fn test_reset_ui_keeps_services() {
        let registry = full();
        let home = registry.home_page().unwrap();
        let products = registry.product_service().unwrap();

        registry.reset(ResetScope::Ui);

        assert!(!Arc::ptr_eq(&home, &registry.home_page().unwrap()));
        assert!(Arc::ptr_eq(&products, &registry.product_service().unwrap()));

        registry.reset(ResetScope::All);
        assert!(!Arc::ptr_eq(&products, &registry.product_service().unwrap()));
    }

    #[test]
    fn test_custom_registration_and_type_mismatch() {
        struct Banner(&'static str);
        impl Entity for Banner {
            const NAME: &'static str = "banner";
        }

        let mut registry = full();
        registry.register(Banner::NAME, EntityScope::Ui, |_| {
            Ok(Arc::new(Banner("spring sale")) as Instance)
        });
        assert_eq!(registry.resolve::<Banner>().unwrap().0, "spring sale");

        registry.register(Banner::NAME, EntityScope::Ui, |_| Ok(Arc::new(42_u32) as Instance));
        assert!(matches!(registry.resolve::<Banner>(), Err(E2eError::NoSuchEntity(_))));
    }

    #[test]
    fn test_missing_page_is_reported() {
        let registry = EntityRegistry::new(SessionBindings::default());
        let err = registry.cart_page().err().unwrap();
        assert!(matches!(err, E2eError::ResourceNotInitialized { dependency: "Page", .. }));
        assert!(registry.page().is_err());
    }
}
