//! Engine wrapper recording what the graph looked like at each analysis

use ncsched::curves::{ArrivalCurve, ServiceCurve};
use ncsched::engine::{
    AnalysisFailure, AnalysisMethod, AnalysisSettings, EngineResult, FlowHandle,
    MultiplexingEnforcement, ServerHandle,
};
use ncsched::{Multiplexing, NetworkCalculusEngine, RateLatencyEngine};
use std::cell::RefCell;

/// One `analyze` call
#[derive(Debug, Clone)]
pub struct AnalyzeCall {
    /// Label of the first server of the analyzed flow, e.g. `"F1,H1:HIGH"`
    pub flow_label: String,
    /// First-server labels of every flow present in the graph
    pub present: Vec<String>,
    pub enforcement: MultiplexingEnforcement,
    pub method: AnalysisMethod,
}

impl AnalyzeCall {
    /// Priority suffix of the analyzed flow's servers
    pub fn priority(&self) -> &str {
        priority_of(&self.flow_label)
    }

    pub fn present_priorities(&self) -> Vec<&str> {
        self.present.iter().map(|l| priority_of(l)).collect()
    }
}

fn priority_of(label: &str) -> &str {
    label.rsplit(':').next().unwrap_or("")
}

/// [`RateLatencyEngine`] that logs every analysis request
#[derive(Debug, Default)]
pub struct RecordingEngine {
    inner: RateLatencyEngine,
    calls: RefCell<Vec<AnalyzeCall>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inner(&self) -> &RateLatencyEngine {
        &self.inner
    }

    pub fn calls(&self) -> Vec<AnalyzeCall> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn first_label(&self, flow: FlowHandle) -> String {
        self.inner
            .flow_path(flow)
            .and_then(|path| path.first())
            .and_then(|&server| self.inner.server_label(server))
            .unwrap_or("?")
            .to_string()
    }
}

impl NetworkCalculusEngine for RecordingEngine {
    fn create_server(
        &mut self,
        label: &str,
        curve: ServiceCurve,
        multiplexing: Multiplexing,
    ) -> EngineResult<ServerHandle> {
        self.inner.create_server(label, curve, multiplexing)
    }

    fn create_turn(&mut self, from: ServerHandle, to: ServerHandle) -> EngineResult<()> {
        self.inner.create_turn(from, to)
    }

    fn create_flow(
        &mut self,
        arrival: ArrivalCurve,
        path: &[ServerHandle],
    ) -> EngineResult<FlowHandle> {
        self.inner.create_flow(arrival, path)
    }

    fn remove_flow(&mut self, flow: FlowHandle) -> EngineResult<()> {
        self.inner.remove_flow(flow)
    }

    fn remove_server(&mut self, server: ServerHandle) -> EngineResult<()> {
        self.inner.remove_server(server)
    }

    fn flows(&self) -> Vec<FlowHandle> {
        self.inner.flows()
    }

    fn servers(&self) -> Vec<ServerHandle> {
        self.inner.servers()
    }

    fn path_len(&self, flow: FlowHandle) -> Option<usize> {
        self.inner.path_len(flow)
    }

    fn analyze(
        &self,
        settings: &AnalysisSettings,
        flow: FlowHandle,
        method: AnalysisMethod,
    ) -> Result<f64, AnalysisFailure> {
        let call = AnalyzeCall {
            flow_label: self.first_label(flow),
            present: self
                .inner
                .flows()
                .into_iter()
                .map(|f| self.first_label(f))
                .collect(),
            enforcement: settings.enforcement,
            method,
        };
        self.calls.borrow_mut().push(call);
        self.inner.analyze(settings, flow, method)
    }
}
