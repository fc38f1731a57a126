use prometheus_client::{
    encoding::EncodeLabelSet,
    metrics::{counter::Counter, family::Family},
    registry::Registry,
};

/// Per-kind admission counters.
#[derive(Clone, Debug)]
pub struct Metrics {
    requests: Family<Labels, Counter>,
    patched: Family<Labels, Counter>,
    errors: Family<Labels, Counter>,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct Labels {
    kind: String,
}

impl Metrics {
    pub fn register(prom: &mut Registry) -> Self {
        let requests = Family::default();
        prom.register(
            "requests",
            "Admission requests handled, by resource kind",
            requests.clone(),
        );

        let patched = Family::default();
        prom.register(
            "patched",
            "Admission responses that carried a patch, by resource kind",
            patched.clone(),
        );

        let errors = Family::default();
        prom.register(
            "errors",
            "Admission requests that failed, by resource kind",
            errors.clone(),
        );

        Self {
            requests,
            patched,
            errors,
        }
    }

    pub(crate) fn incr_requests(&self, kind: &str) {
        self.requests.get_or_create(&Labels::new(kind)).inc();
    }

    pub(crate) fn incr_patched(&self, kind: &str) {
        self.patched.get_or_create(&Labels::new(kind)).inc();
    }

    pub(crate) fn incr_errors(&self, kind: &str) {
        self.errors.get_or_create(&Labels::new(kind)).inc();
    }
}

impl Labels {
    fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
        }
    }
}
