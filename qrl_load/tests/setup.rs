use qrl_load::{Initializer, State};
use qrl_samples::Library;
use std::sync::Arc;

pub const BUTTON: &str = "https://site.test/app/widgets/button.js";
pub const COUNTER: &str = "https://site.test/app/widgets/counter.js";

/// Creates a loader backed by the sample site, returning the library to allow inspection of the loads.
pub fn initialize_site() -> (Arc<Library>, Arc<State>) {
    initialize_with(Library::site())
}

pub fn initialize_with(library: Library) -> (Arc<Library>, Arc<State>) {
    let library = Arc::new(library);
    let mut initializer = Initializer::new();
    initializer.set_resolver(library.clone());
    (library, State::initialize(initializer))
}
