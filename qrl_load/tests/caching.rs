mod setup;

use qrl::SymbolReference;
use qrl_load::module::Exports;
use qrl_load::{Config, Deferred, Initializer, State};
use qrl_samples::Library;
use std::sync::Arc;

fn button_path() -> qrl::ModulePath {
    SymbolReference::resolve(&qrl_samples::site(), "./widgets/button")
        .unwrap()
        .module()
        .clone()
}

#[tokio::test]
async fn statistics_count_hits_joins_and_loads() {
    let (_, state) = setup::initialize_site();
    let document = qrl_samples::site();

    let pending = state.resolve(&document, "./widgets/button").unwrap();
    let joined = state.resolve(&document, "./widgets/button").unwrap();
    pending.await.unwrap();
    joined.await.unwrap();
    assert!(state.resolve(&document, "./widgets/button").unwrap().is_ready());
    state.resolve(&document, "./widgets/slider").unwrap().await.unwrap_err();

    let statistics = state.statistics();
    assert_eq!(statistics.hits, 1);
    assert_eq!(statistics.joins, 1);
    assert_eq!(statistics.misses, 2);
    assert_eq!(statistics.loads, 2);
    assert_eq!(statistics.failures, 1);
}

#[tokio::test]
async fn invalidated_module_is_loaded_again() {
    let (library, state) = setup::initialize_site();
    let document = qrl_samples::site();

    let before = state.resolve(&document, "./widgets/button").unwrap().await.unwrap();
    assert_eq!(before.downcast_ref::<&str>(), Some(&"Button"));

    library.add_module(setup::BUTTON, Exports::new().with("default", "Button v2"));
    assert!(state.resolve(&document, "./widgets/button").unwrap().is_ready());

    assert!(state.invalidate(&button_path()));
    assert!(!state.invalidate(&button_path()));

    let after = state.resolve(&document, "./widgets/button").unwrap();
    assert!(!after.is_ready());
    assert_eq!(after.await.unwrap().downcast_ref::<&str>(), Some(&"Button v2"));
    assert_eq!(library.load_count(setup::BUTTON), 2);
}

#[tokio::test]
async fn load_settling_after_invalidation_is_not_cached() {
    let library = Library::new();
    let gate = library.add_gated_module(setup::BUTTON, qrl_samples::button());
    let (library, state) = setup::initialize_with(library);
    let document = qrl_samples::site();

    let stale = state.resolve(&document, "./widgets/button").unwrap();
    assert!(state.invalidate(&button_path()));
    let fresh = state.resolve(&document, "./widgets/button").unwrap();

    gate.open();
    stale.await.unwrap();
    assert!(state.cached(&document, "./widgets/button").unwrap().is_none());

    fresh.await.unwrap();
    assert!(state.cached(&document, "./widgets/button").unwrap().is_some());
    assert_eq!(library.load_count(setup::BUTTON), 2);
}

#[tokio::test]
async fn failures_of_invalidated_loads_are_not_counted() {
    let library = Library::new();
    let gate = library.add_gated_failing_module(setup::BUTTON, qrl_samples::button(), 1);
    let (library, state) = setup::initialize_with(library);
    let document = qrl_samples::site();

    let stale = state.resolve(&document, "./widgets/button").unwrap();
    assert!(state.invalidate(&button_path()));
    gate.open();

    assert!(stale.await.is_err());
    assert_eq!(state.statistics().failures, 0);

    state.resolve(&document, "./widgets/button").unwrap().await.unwrap();
    assert_eq!(state.statistics().failures, 0);
    assert_eq!(library.load_count(setup::BUTTON), 2);
}

#[tokio::test]
async fn clear_drops_every_entry() {
    let (library, state) = setup::initialize_site();
    let document = qrl_samples::site();

    state.resolve(&document, "./widgets/button").unwrap().await.unwrap();
    state.resolve(&document, "./widgets/counter").unwrap().await.unwrap();
    state.clear();

    assert!(state.cached(&document, "./widgets/button").unwrap().is_none());
    assert!(state.cached(&document, "./widgets/counter").unwrap().is_none());

    state.resolve(&document, "./widgets/counter.initial").unwrap().await.unwrap();
    assert_eq!(library.load_count(setup::COUNTER), 2);
    assert_eq!(library.load_count(setup::BUTTON), 1);
}

#[tokio::test]
async fn preload_shares_the_module_load() {
    let library = Library::new();
    let gate = library.add_gated_module(setup::BUTTON, qrl_samples::button());
    let (library, state) = setup::initialize_with(library);
    let document = qrl_samples::site();

    let preloaded = state.preload(&document, "./widgets/button.onClick").unwrap();
    assert!(!preloaded.is_settled());
    let symbol = state.resolve(&document, "./widgets/button.onHover").unwrap();

    gate.open();
    let module = preloaded.await.unwrap();
    assert_eq!(module.specifier().as_str(), setup::BUTTON);
    assert_eq!(module.exports().len(), 3);
    symbol.await.unwrap();

    let again = state.preload(&document, "./widgets/button").unwrap();
    assert!(again.is_settled());
    assert_eq!(library.load_count(setup::BUTTON), 1);
}

#[tokio::test]
async fn cached_never_starts_a_load() {
    let (library, state) = setup::initialize_site();
    let document = qrl_samples::site();

    assert!(state.cached(&document, "./widgets/button").unwrap().is_none());
    assert_eq!(library.total_loads(), 0);
}

#[tokio::test]
async fn module_extension_is_configurable() {
    let library = Arc::new(Library::new());
    library.add_module("https://site.test/app/widgets/button.mjs", qrl_samples::button());

    let config: Config = toml::from_str(r#"module_extension = ".mjs""#).unwrap();
    let mut initializer = Initializer::with_config(config);
    initializer.set_resolver(library.clone());
    let state = State::initialize(initializer);
    assert_eq!(state.module_extension(), ".mjs");

    let value = state
        .resolve(&qrl_samples::site(), "./widgets/button")
        .unwrap()
        .await
        .unwrap();
    assert_eq!(value.downcast_ref::<&str>(), Some(&"Button"));
    assert_eq!(library.load_count("https://site.test/app/widgets/button.mjs"), 1);
}

#[tokio::test]
async fn default_state_finds_no_modules() {
    let state = State::new();
    let resolution = state.resolve(&qrl_samples::site(), "./widgets/button").unwrap();
    match resolution {
        qrl_load::Resolution::Pending(deferred) => {
            let deferred: Deferred = deferred;
            assert!(matches!(deferred.await, Err(qrl_load::LoadError::ModuleNotFound(_))));
        }
        qrl_load::Resolution::Ready(_) => panic!("no module should be found"),
    }
}
