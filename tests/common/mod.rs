#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use module_host::{App, AppConfig, AppHooks, Module, ParentModule, RouteGroups};

// --- Recording Probe Module ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Hooks,
    Routes,
}

/// Shared log every probe writes its visits into.
#[derive(Default)]
pub struct Journal {
    hooks: Mutex<Vec<String>>,
    routes: Mutex<Vec<(String, RouteGroups)>>,
}

impl Journal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn hook_order(&self) -> Vec<String> {
        self.hooks.lock().unwrap().clone()
    }

    pub fn route_order(&self) -> Vec<String> {
        self.routes
            .lock()
            .unwrap()
            .iter()
            .map(|(label, _)| label.clone())
            .collect()
    }

    /// The triple the module labelled `label` received (first visit).
    pub fn groups_for(&self, label: &str) -> RouteGroups {
        self.routes
            .lock()
            .unwrap()
            .iter()
            .find(|(seen, _)| seen == label)
            .map(|(_, groups)| groups.clone())
            .unwrap_or_else(|| panic!("module `{label}` never mounted routes"))
    }
}

pub struct Probe {
    label: String,
    segment: String,
    journal: Arc<Journal>,
    fail_on: Option<Phase>,
    children: Option<Vec<Arc<dyn Module>>>,
    children_calls: AtomicUsize,
}

impl Probe {
    pub fn leaf(label: &str, segment: &str, journal: &Arc<Journal>) -> Self {
        Self {
            label: label.to_string(),
            segment: segment.to_string(),
            journal: Arc::clone(journal),
            fail_on: None,
            children: None,
            children_calls: AtomicUsize::new(0),
        }
    }

    pub fn parent(
        label: &str,
        segment: &str,
        journal: &Arc<Journal>,
        children: Vec<Arc<dyn Module>>,
    ) -> Self {
        Self {
            children: Some(children),
            ..Self::leaf(label, segment, journal)
        }
    }

    pub fn failing(mut self, phase: Phase) -> Self {
        self.fail_on = Some(phase);
        self
    }

    pub fn children_calls(&self) -> usize {
        self.children_calls.load(Ordering::SeqCst)
    }
}

impl Module for Probe {
    fn path_segment(&self) -> &str {
        &self.segment
    }

    fn name(&self) -> &str {
        &self.label
    }

    fn bind_hooks(&self, _hooks: &dyn AppHooks) -> anyhow::Result<()> {
        self.journal.hooks.lock().unwrap().push(self.label.clone());
        if self.fail_on == Some(Phase::Hooks) {
            anyhow::bail!("{} refused to bind hooks", self.label);
        }
        Ok(())
    }

    fn mount_routes(&self, groups: &RouteGroups) -> anyhow::Result<()> {
        self.journal
            .routes
            .lock()
            .unwrap()
            .push((self.label.clone(), groups.clone()));
        if self.fail_on == Some(Phase::Routes) {
            anyhow::bail!("{} refused to mount routes", self.label);
        }
        Ok(())
    }

    fn as_parent(&self) -> Option<&dyn ParentModule> {
        self.children.as_ref().map(|_| self as &dyn ParentModule)
    }
}

impl ParentModule for Probe {
    fn children(&self) -> &[Arc<dyn Module>] {
        self.children_calls.fetch_add(1, Ordering::SeqCst);
        self.children.as_deref().unwrap_or(&[])
    }
}

// --- Helpers ---

pub fn test_app() -> Arc<App> {
    Arc::new(App::new(AppConfig::default()))
}

pub fn leaf(label: &str, segment: &str, journal: &Arc<Journal>) -> Arc<dyn Module> {
    Arc::new(Probe::leaf(label, segment, journal))
}

pub fn parent(
    label: &str,
    segment: &str,
    journal: &Arc<Journal>,
    children: Vec<Arc<dyn Module>>,
) -> Arc<dyn Module> {
    Arc::new(Probe::parent(label, segment, journal, children))
}

pub fn failing(label: &str, segment: &str, journal: &Arc<Journal>, phase: Phase) -> Arc<dyn Module> {
    Arc::new(Probe::leaf(label, segment, journal).failing(phase))
}
