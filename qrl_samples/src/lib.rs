//! Contains sample modules and an in-memory module resolver used to exercise the loader.

use async_trait::async_trait;
use futures::channel::oneshot;
use futures::future::{FutureExt as _, Shared};
use parking_lot::Mutex;
use qrl::{Document, ModuleSpecifier};
use qrl_load::module::Exports;
use qrl_load::Resolver;

/// The base location of the sample documents.
pub const SITE_BASE: &str = "https://site.test/app/";

/// Signature of the event handlers exported by the sample modules.
pub type Handler = fn(&str) -> String;

/// Gets the sample document, anchored at [`SITE_BASE`].
pub fn site() -> Document {
    Document::parse(SITE_BASE).expect("sample base location is valid")
}

fn on_click(target: &str) -> String {
    format!("clicked {}", target)
}

fn on_hover(target: &str) -> String {
    format!("hovered {}", target)
}

/// A module exporting a component name as its `default` export along with two event handlers.
///
/// # Examples
///
/// ```
/// use qrl::Id;
/// use qrl_samples::Handler;
///
/// let button = qrl_samples::button();
/// let on_click = button.get(Id::try_from_str("onClick")?).and_then(|value| value.downcast_ref::<Handler>());
/// assert_eq!(on_click.map(|handler| handler("#submit")).as_deref(), Some("clicked #submit"));
///
/// # Result::<_, Box<dyn std::error::Error>>::Ok(())
/// ```
pub fn button() -> Exports {
    Exports::new()
        .with("default", "Button")
        .with("onClick", on_click as Handler)
        .with("onHover", on_hover as Handler)
}

/// A module exporting a component name, an initial count, and a step function.
pub fn counter() -> Exports {
    Exports::new()
        .with("default", "Counter")
        .with("initial", 0i64)
        .with("increment", (|count: i64| count + 1) as fn(i64) -> i64)
}

/// The error returned when a sample module is configured to fail.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[error("sample module {specifier} failed to evaluate")]
pub struct SampleError {
    specifier: String,
}

impl SampleError {
    pub fn specifier(&self) -> &str {
        &self.specifier
    }
}

/// Holds back the loads of a sample module until it is opened, allowing pending loads to be observed.
///
/// Dropping the gate also releases the waiting loads.
#[derive(Debug)]
#[must_use = "loads of the module wait until the gate is opened"]
pub struct Gate(oneshot::Sender<()>);

impl Gate {
    pub fn open(self) {
        // The module may never have been requested, in which case nobody is listening.
        let _ = self.0.send(());
    }
}

struct Sample {
    exports: Exports,
    failures: usize,
    gate: Option<Shared<oneshot::Receiver<()>>>,
}

/// An in-memory module resolver that counts how many times each module is loaded.
#[derive(Default)]
pub struct Library {
    samples: Mutex<rustc_hash::FxHashMap<String, Sample>>,
    loads: Mutex<rustc_hash::FxHashMap<String, usize>>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a library containing the sample modules of the sample site, using the `.js` module extension.
    ///
    /// | Module specifier                              | Exports       |
    /// |-----------------------------------------------|---------------|
    /// | `https://site.test/app/widgets/button.js`     | [`button()`]  |
    /// | `https://site.test/app/widgets/counter.js`    | [`counter()`] |
    /// | `https://site.test/app/v1.2/widgets/button.js`| [`button()`]  |
    /// | `https://site.test/app/.config.js`            | `default`     |
    pub fn site() -> Self {
        let library = Self::new();
        library.add_module("https://site.test/app/widgets/button.js", button());
        library.add_module("https://site.test/app/widgets/counter.js", counter());
        library.add_module("https://site.test/app/v1.2/widgets/button.js", button());
        library.add_module(
            "https://site.test/app/.config.js",
            Exports::new().with("default", "config"),
        );
        library
    }

    /// Adds a module, replacing any module previously added with the same specifier.
    pub fn add_module(&self, specifier: &str, exports: Exports) {
        self.insert(specifier, exports, 0, None);
    }

    /// Adds a module whose first loads fail with a [`SampleError`].
    pub fn add_failing_module(&self, specifier: &str, exports: Exports, failures: usize) {
        self.insert(specifier, exports, failures, None);
    }

    /// Adds a module whose loads wait until the returned [`Gate`] is opened.
    pub fn add_gated_module(&self, specifier: &str, exports: Exports) -> Gate {
        self.add_gated_failing_module(specifier, exports, 0)
    }

    /// Adds a module whose loads wait until the returned [`Gate`] is opened, and whose first loads then fail.
    pub fn add_gated_failing_module(&self, specifier: &str, exports: Exports, failures: usize) -> Gate {
        let (sender, receiver) = oneshot::channel();
        self.insert(specifier, exports, failures, Some(receiver.shared()));
        Gate(sender)
    }

    fn insert(&self, specifier: &str, exports: Exports, failures: usize, gate: Option<Shared<oneshot::Receiver<()>>>) {
        self.samples.lock().insert(
            specifier.to_string(),
            Sample {
                exports,
                failures,
                gate,
            },
        );
    }

    /// Gets the number of times the module with the specified specifier was requested.
    pub fn load_count(&self, specifier: &str) -> usize {
        self.loads.lock().get(specifier).copied().unwrap_or_default()
    }

    /// Gets the number of times any module was requested.
    pub fn total_loads(&self) -> usize {
        self.loads.lock().values().sum()
    }
}

#[async_trait]
impl Resolver for Library {
    type Error = SampleError;

    async fn load_module(&self, specifier: &ModuleSpecifier) -> Result<Option<Exports>, SampleError> {
        *self.loads.lock().entry(specifier.to_string()).or_default() += 1;

        let (outcome, gate) = match self.samples.lock().get_mut(specifier.as_str()) {
            None => return Ok(None),
            Some(sample) if sample.failures > 0 => {
                sample.failures -= 1;
                let error = SampleError {
                    specifier: specifier.to_string(),
                };
                (Err(error), sample.gate.clone())
            }
            Some(sample) => (Ok(sample.exports.clone()), sample.gate.clone()),
        };

        if let Some(gate) = gate {
            // Both opening and dropping the gate release the load.
            let _ = gate.await;
        }

        outcome.map(Some)
    }
}
