use crate::model::FunctionGraph;
use crate::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pull-based view of the external analysis engine.
///
/// Every lookup may miss. A miss is a lookup failure the caller degrades
/// gracefully on, never an error that aborts rendering.
pub trait AnalysisSource {
    /// Entry addresses of all known functions, in address order.
    fn functions(&self) -> Vec<Address>;

    fn function_graph(&self, function: Address) -> Option<FunctionGraph>;

    fn label(&self, addr: Address) -> Option<String>;

    fn comment(&self, addr: Address) -> Option<String>;

    /// Display text of a string referenced by the instruction at `addr`.
    fn string_reference(&self, addr: Address) -> Option<String>;
}

/// In-memory engine state, loadable from JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgramSnapshot {
    pub functions: Vec<FunctionGraph>,
    pub labels: BTreeMap<Address, String>,
    pub comments: BTreeMap<Address, String>,
    pub strings: BTreeMap<Address, String>,
}

impl ProgramSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_function(mut self, graph: FunctionGraph) -> Self {
        self.functions.push(graph);
        self
    }

    pub fn rename_label(&mut self, addr: Address, text: impl Into<String>) {
        self.labels.insert(addr, text.into());
    }

    pub fn set_comment(&mut self, addr: Address, text: Option<String>) {
        match text {
            Some(text) => {
                self.comments.insert(addr, text);
            }
            None => {
                self.comments.remove(&addr);
            }
        }
    }

    pub fn replace_function(&mut self, graph: FunctionGraph) {
        match self
            .functions
            .iter_mut()
            .find(|existing| existing.function == graph.function)
        {
            Some(existing) => *existing = graph,
            None => self.functions.push(graph),
        }
    }
}

impl AnalysisSource for ProgramSnapshot {
    fn functions(&self) -> Vec<Address> {
        let mut addrs: Vec<Address> = self.functions.iter().map(|f| f.function).collect();
        addrs.sort_unstable();
        addrs
    }

    fn function_graph(&self, function: Address) -> Option<FunctionGraph> {
        self.functions
            .iter()
            .find(|graph| graph.function == function)
            .cloned()
    }

    fn label(&self, addr: Address) -> Option<String> {
        self.labels.get(&addr).cloned()
    }

    fn comment(&self, addr: Address) -> Option<String> {
        self.comments.get(&addr).cloned()
    }

    fn string_reference(&self, addr: Address) -> Option<String> {
        self.strings.get(&addr).cloned()
    }
}

impl<T: AnalysisSource + ?Sized> AnalysisSource for &T {
    fn functions(&self) -> Vec<Address> {
        (**self).functions()
    }

    fn function_graph(&self, function: Address) -> Option<FunctionGraph> {
        (**self).function_graph(function)
    }

    fn label(&self, addr: Address) -> Option<String> {
        (**self).label(addr)
    }

    fn comment(&self, addr: Address) -> Option<String> {
        (**self).comment(addr)
    }

    fn string_reference(&self, addr: Address) -> Option<String> {
        (**self).string_reference(addr)
    }
}

impl<T: AnalysisSource + ?Sized> AnalysisSource for std::rc::Rc<std::cell::RefCell<T>> {
    fn functions(&self) -> Vec<Address> {
        self.borrow().functions()
    }

    fn function_graph(&self, function: Address) -> Option<FunctionGraph> {
        self.borrow().function_graph(function)
    }

    fn label(&self, addr: Address) -> Option<String> {
        self.borrow().label(addr)
    }

    fn comment(&self, addr: Address) -> Option<String> {
        self.borrow().comment(addr)
    }

    fn string_reference(&self, addr: Address) -> Option<String> {
        self.borrow().string_reference(addr)
    }
}
