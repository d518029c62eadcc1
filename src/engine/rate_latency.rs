//! Built-in closed-form engine
//!
//! [`RateLatencyEngine`] analyzes networks of rate-latency servers fed by
//! token-bucket (or peak-rate) flows. All bounds are closed forms:
//!
//! - **Leftover service** at a server `(R, T)` for one flow, with cross
//!   traffic `(Σr, Σb)` under arbitrary multiplexing:
//!   `R' = R − Σr`, `T' = (R·T + Σb) / R'`
//! - **Arrival bounds** of cross traffic are propagated hop by hop: a bucket
//!   `(r, b)` leaves a server with burst `b + r·T'`
//! - **TFA** sums the aggregate delay `T + Σb/R` of every server on the path
//! - **SFA** concatenates the leftover curves: `ΣT' + b / min R'`
//! - **PMOO** pays each cross flow's burst once per shared segment
//! - **TMA** returns the tighter of the SFA and PMOO bounds
//!
//! FIFO servers are bounded like arbitrary ones, which is valid but not tight.
//! Arrival bounds that depend on themselves are reported as a cyclic
//! dependency instead of recursing.

use super::{
    AnalysisFailure, AnalysisMethod, AnalysisSettings, EngineError, EngineResult, FlowHandle,
    Multiplexing, NetworkCalculusEngine, ServerHandle,
};
use crate::curves::{ArrivalCurve, ServiceCurve};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone)]
struct ServerSlot {
    label: String,
    curve: ServiceCurve,
    multiplexing: Multiplexing,
}

#[derive(Debug, Clone)]
struct FlowSlot {
    arrival: ArrivalCurve,
    path: Vec<ServerHandle>,
}

/// Engine for rate-latency servers and token-bucket arrivals
///
/// Handles are slot indices. Once every flow (or every server) has been
/// removed, numbering starts over at zero, so rebuilding the same network
/// after a reset yields the same handles.
#[derive(Debug, Clone, Default)]
pub struct RateLatencyEngine {
    servers: Vec<Option<ServerSlot>>,
    flows: Vec<Option<FlowSlot>>,
    turns: BTreeSet<(ServerHandle, ServerHandle)>,
}

impl RateLatencyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn server_slot(&self, server: ServerHandle) -> EngineResult<&ServerSlot> {
        self.servers
            .get(server.index())
            .and_then(Option::as_ref)
            .ok_or(EngineError::UnknownServer(server))
    }

    fn flow_slot(&self, flow: FlowHandle) -> EngineResult<&FlowSlot> {
        self.flows
            .get(flow.index())
            .and_then(Option::as_ref)
            .ok_or(EngineError::UnknownFlow(flow))
    }

    fn live_flows(&self) -> impl Iterator<Item = (FlowHandle, &FlowSlot)> {
        self.flows
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|s| (FlowHandle(i as u32), s)))
    }

    /// Service curve a server was created with
    pub fn server_curve(&self, server: ServerHandle) -> Option<ServiceCurve> {
        self.server_slot(server).ok().map(|s| s.curve)
    }

    pub fn server_label(&self, server: ServerHandle) -> Option<&str> {
        self.server_slot(server).ok().map(|s| s.label.as_str())
    }

    pub fn flow_path(&self, flow: FlowHandle) -> Option<&[ServerHandle]> {
        self.flow_slot(flow).ok().map(|f| f.path.as_slice())
    }

    pub fn has_turn(&self, from: ServerHandle, to: ServerHandle) -> bool {
        self.turns.contains(&(from, to))
    }

    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }
}

impl NetworkCalculusEngine for RateLatencyEngine {
    fn create_server(
        &mut self,
        label: &str,
        curve: ServiceCurve,
        multiplexing: Multiplexing,
    ) -> EngineResult<ServerHandle> {
        let handle = ServerHandle(self.servers.len() as u32);
        self.servers.push(Some(ServerSlot {
            label: label.to_string(),
            curve,
            multiplexing,
        }));
        Ok(handle)
    }

    fn create_turn(&mut self, from: ServerHandle, to: ServerHandle) -> EngineResult<()> {
        self.server_slot(from)?;
        self.server_slot(to)?;
        self.turns.insert((from, to));
        Ok(())
    }

    fn create_flow(
        &mut self,
        arrival: ArrivalCurve,
        path: &[ServerHandle],
    ) -> EngineResult<FlowHandle> {
        if path.is_empty() {
            return Err(EngineError::EmptyPath);
        }
        for &server in path {
            self.server_slot(server)?;
        }
        let handle = FlowHandle(self.flows.len() as u32);
        self.flows.push(Some(FlowSlot {
            arrival,
            path: path.to_vec(),
        }));
        Ok(handle)
    }

    fn remove_flow(&mut self, flow: FlowHandle) -> EngineResult<()> {
        self.flow_slot(flow)?;
        self.flows[flow.index()] = None;
        if self.flows.iter().all(Option::is_none) {
            self.flows.clear();
        }
        Ok(())
    }

    fn remove_server(&mut self, server: ServerHandle) -> EngineResult<()> {
        self.server_slot(server)?;
        if self.live_flows().any(|(_, f)| f.path.contains(&server)) {
            return Err(EngineError::ServerInUse(server));
        }
        self.servers[server.index()] = None;
        self.turns.retain(|&(a, b)| a != server && b != server);
        if self.servers.iter().all(Option::is_none) {
            self.servers.clear();
        }
        Ok(())
    }

    fn flows(&self) -> Vec<FlowHandle> {
        self.live_flows().map(|(handle, _)| handle).collect()
    }

    fn servers(&self) -> Vec<ServerHandle> {
        self.servers
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(i, _)| ServerHandle(i as u32))
            .collect()
    }

    fn path_len(&self, flow: FlowHandle) -> Option<usize> {
        self.flow_path(flow).map(<[ServerHandle]>::len)
    }

    fn analyze(
        &self,
        settings: &AnalysisSettings,
        flow: FlowHandle,
        method: AnalysisMethod,
    ) -> Result<f64, AnalysisFailure> {
        let slot = self.flow_slot(flow)?;

        if !settings.arrival_bound.is_stable() {
            return Err(AnalysisFailure::EngineInternal(format!(
                "{} arrival bounding did not terminate",
                settings.arrival_bound
            )));
        }

        let mut fifo_on_path = false;
        for &server in &slot.path {
            let declared = self.server_slot(server)?.multiplexing;
            fifo_on_path |= settings.enforcement.effective(declared) == Multiplexing::Fifo;
        }
        if fifo_on_path && !method.supports_fifo() {
            return Err(AnalysisFailure::UnsupportedCombination {
                method,
                multiplexing: Multiplexing::Fifo,
            });
        }
        if fifo_on_path && !settings.arrival_bound.supports_fifo() {
            return Err(AnalysisFailure::UnsupportedArrivalBound {
                method: settings.arrival_bound,
                multiplexing: Multiplexing::Fifo,
            });
        }

        let mut eval = Evaluation::new(self);
        match method {
            AnalysisMethod::Tfa => eval.total_flow(flow),
            AnalysisMethod::Sfa => eval.separate_flow(flow),
            AnalysisMethod::Pmoo => eval.pay_multiplexing_once(flow),
            AnalysisMethod::Tma => {
                let separate = eval.separate_flow(flow)?;
                let pmoo = eval.pay_multiplexing_once(flow)?;
                Ok(separate.min(pmoo))
            }
        }
    }
}

/// Token bucket `(rate, burst)` observed at some point in the network
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Bucket {
    rate: f64,
    burst: f64,
}

impl Bucket {
    fn of(arrival: &ArrivalCurve) -> Self {
        Self {
            rate: arrival.rate(),
            burst: arrival.burst(),
        }
    }

    fn add(&mut self, other: Bucket) {
        self.rate += other.rate;
        self.burst += other.burst;
    }
}

/// State of one analysis request: memoized arrival bounds plus the set of
/// bounds currently being computed
struct Evaluation<'a> {
    engine: &'a RateLatencyEngine,
    arrivals: HashMap<(FlowHandle, usize), Bucket>,
    in_progress: HashSet<(FlowHandle, usize)>,
}

impl<'a> Evaluation<'a> {
    fn new(engine: &'a RateLatencyEngine) -> Self {
        Self {
            engine,
            arrivals: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    /// Arrival bound of `flow` at the entrance of its `hop`-th server
    fn arrival_at(&mut self, flow: FlowHandle, hop: usize) -> Result<Bucket, AnalysisFailure> {
        if let Some(bucket) = self.arrivals.get(&(flow, hop)) {
            return Ok(*bucket);
        }
        let engine = self.engine;
        let slot = engine.flow_slot(flow)?;
        if hop == 0 {
            return Ok(Bucket::of(&slot.arrival));
        }

        if !self.in_progress.insert((flow, hop)) {
            return Err(AnalysisFailure::CyclicDependency(format!(
                "arrival bound of {} at hop {} depends on itself",
                flow, hop
            )));
        }
        let upstream = slot.path[hop - 1];
        let result = self.arrival_at(flow, hop - 1).and_then(|input| {
            let leftover = self.leftover(upstream, flow)?;
            Ok(Bucket {
                rate: input.rate,
                burst: input.burst + input.rate * leftover.latency,
            })
        });
        self.in_progress.remove(&(flow, hop));

        let bucket = result?;
        self.arrivals.insert((flow, hop), bucket);
        Ok(bucket)
    }

    /// Aggregate arrivals at `server`, optionally leaving one flow out
    fn traffic_at(
        &mut self,
        server: ServerHandle,
        exclude: Option<FlowHandle>,
    ) -> Result<Bucket, AnalysisFailure> {
        let engine = self.engine;
        let mut total = Bucket::default();
        for (other, slot) in engine.live_flows() {
            if Some(other) == exclude {
                continue;
            }
            if let Some(hop) = slot.path.iter().position(|&s| s == server) {
                total.add(self.arrival_at(other, hop)?);
            }
        }
        Ok(total)
    }

    /// Service left over for `flow` at `server` under arbitrary multiplexing
    fn leftover(
        &mut self,
        server: ServerHandle,
        flow: FlowHandle,
    ) -> Result<ServiceCurve, AnalysisFailure> {
        let engine = self.engine;
        let slot = engine.server_slot(server)?;
        let cross = self.traffic_at(server, Some(flow))?;
        let rate = slot.curve.rate - cross.rate;
        if rate <= 0.0 {
            return Err(AnalysisFailure::Unbounded {
                server: slot.label.clone(),
            });
        }
        Ok(ServiceCurve::new(
            rate,
            (slot.curve.rate * slot.curve.latency + cross.burst) / rate,
        ))
    }

    fn total_flow(&mut self, flow: FlowHandle) -> Result<f64, AnalysisFailure> {
        let engine = self.engine;
        let mut delay = 0.0;
        for &server in &engine.flow_slot(flow)?.path {
            let slot = engine.server_slot(server)?;
            let aggregate = self.traffic_at(server, None)?;
            if aggregate.rate > slot.curve.rate {
                return Err(AnalysisFailure::Unbounded {
                    server: slot.label.clone(),
                });
            }
            delay += slot.curve.latency + aggregate.burst / slot.curve.rate;
        }
        Ok(delay)
    }

    fn separate_flow(&mut self, flow: FlowHandle) -> Result<f64, AnalysisFailure> {
        let engine = self.engine;
        let slot = engine.flow_slot(flow)?;
        let mut latency = 0.0;
        let mut rate = f64::INFINITY;
        for &server in &slot.path {
            let leftover = self.leftover(server, flow)?;
            latency += leftover.latency;
            rate = rate.min(leftover.rate);
        }
        Ok(latency + slot.arrival.burst() / rate)
    }

    fn pay_multiplexing_once(&mut self, flow: FlowHandle) -> Result<f64, AnalysisFailure> {
        let engine = self.engine;
        let slot = engine.flow_slot(flow)?;
        let path = &slot.path;

        let mut rate = f64::INFINITY;
        let mut latency = 0.0;
        for &server in path {
            let server_slot = engine.server_slot(server)?;
            let mut cross_rate = 0.0;
            for (other, other_slot) in engine.live_flows() {
                if other != flow && other_slot.path.contains(&server) {
                    cross_rate += other_slot.arrival.rate();
                }
            }
            let leftover_rate = server_slot.curve.rate - cross_rate;
            if leftover_rate <= 0.0 {
                return Err(AnalysisFailure::Unbounded {
                    server: server_slot.label.clone(),
                });
            }
            rate = rate.min(leftover_rate);
            latency += server_slot.curve.latency;
        }

        // Each cross flow pays its burst once per contiguous segment it shares
        for (other, other_slot) in engine.live_flows() {
            if other == flow {
                continue;
            }
            let hops: Vec<Option<usize>> = path
                .iter()
                .map(|s| other_slot.path.iter().position(|o| o == s))
                .collect();

            let mut i = 0;
            while i < path.len() {
                let Some(entry_hop) = hops[i] else {
                    i += 1;
                    continue;
                };
                let mut segment_latency = engine.server_slot(path[i])?.curve.latency;
                let mut last_hop = entry_hop;
                let mut j = i + 1;
                while j < path.len() && hops[j] == Some(last_hop + 1) {
                    segment_latency += engine.server_slot(path[j])?.curve.latency;
                    last_hop += 1;
                    j += 1;
                }
                let entry = self.arrival_at(other, entry_hop)?;
                latency += (entry.burst + entry.rate * segment_latency) / rate;
                i = j;
            }
        }

        Ok(latency + slot.arrival.burst() / rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ArrivalBoundMethod, MultiplexingEnforcement};

    fn settings() -> AnalysisSettings {
        AnalysisSettings::nominal(ArrivalBoundMethod::AggrPbooConcatenation, Multiplexing::Arbitrary)
    }

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{} != {}", a, b);
    }

    /// Two hops: a field-device link with simple curves, then an SP link
    fn two_hop(multiplexing: Multiplexing) -> (RateLatencyEngine, FlowHandle) {
        let mut engine = RateLatencyEngine::new();
        let s1 = engine
            .create_server("F1,H1:HIGH", ServiceCurve::new(200.0, 1.275), multiplexing)
            .unwrap();
        let s2 = engine
            .create_server("H1,S1:HIGH", ServiceCurve::new(200.0, 2.55), multiplexing)
            .unwrap();
        engine.create_turn(s1, s2).unwrap();
        let flow = engine
            .create_flow(ArrivalCurve::token_bucket(50.0, 255.0), &[s1, s2])
            .unwrap();
        (engine, flow)
    }

    #[test]
    fn test_single_flow_bounds() {
        let (engine, flow) = two_hop(Multiplexing::Arbitrary);
        let s = settings();
        assert_close(engine.analyze(&s, flow, AnalysisMethod::Sfa).unwrap(), 5.1);
        assert_close(engine.analyze(&s, flow, AnalysisMethod::Pmoo).unwrap(), 5.1);
        assert_close(engine.analyze(&s, flow, AnalysisMethod::Tma).unwrap(), 5.1);
        // 1.275 + 255/200, then 2.55 + (255 + 50·1.275)/200
        assert_close(engine.analyze(&s, flow, AnalysisMethod::Tfa).unwrap(), 6.69375);
    }

    #[test]
    fn test_cross_traffic_leftover() {
        let (mut engine, foi) = two_hop(Multiplexing::Arbitrary);
        let s2 = engine.flow_path(foi).unwrap()[1];
        engine
            .create_flow(ArrivalCurve::token_bucket(50.0, 255.0), &[s2])
            .unwrap();
        let s = settings();
        // s2 leftover: R' = 150, T' = (200·2.55 + 255)/150 = 5.1
        assert_close(engine.analyze(&s, foi, AnalysisMethod::Sfa).unwrap(), 8.075);
        assert_close(engine.analyze(&s, foi, AnalysisMethod::Pmoo).unwrap(), 8.075);
        assert_close(
            engine.analyze(&s, foi, AnalysisMethod::Tfa).unwrap(),
            2.55 + 2.55 + 573.75 / 200.0,
        );
    }

    #[test]
    fn test_fifo_rejects_pmoo_and_tma() {
        let (engine, flow) = two_hop(Multiplexing::Fifo);
        let local = AnalysisSettings::nominal(ArrivalBoundMethod::SegrPboo, Multiplexing::Fifo);
        for method in [AnalysisMethod::Pmoo, AnalysisMethod::Tma] {
            assert_eq!(
                engine.analyze(&local, flow, method),
                Err(AnalysisFailure::UnsupportedCombination {
                    method,
                    multiplexing: Multiplexing::Fifo
                })
            );
        }
        assert!(engine.analyze(&local, flow, AnalysisMethod::Sfa).is_ok());
        // Forcing arbitrary multiplexing lifts the restriction
        assert!(engine
            .analyze(&local.forced_arbitrary(), flow, AnalysisMethod::Pmoo)
            .is_ok());
    }

    #[test]
    fn test_fifo_rejects_incompatible_arrival_bound() {
        let (engine, flow) = two_hop(Multiplexing::Fifo);
        let s = AnalysisSettings {
            arrival_bound: ArrivalBoundMethod::AggrTm,
            enforcement: MultiplexingEnforcement::ServerLocal,
        };
        assert!(matches!(
            engine.analyze(&s, flow, AnalysisMethod::Sfa),
            Err(AnalysisFailure::UnsupportedArrivalBound { .. })
        ));
    }

    #[test]
    fn test_segregated_tm_fails_internally() {
        let (engine, flow) = two_hop(Multiplexing::Arbitrary);
        let s = AnalysisSettings::nominal(ArrivalBoundMethod::SegrTm, Multiplexing::Arbitrary);
        assert!(matches!(
            engine.analyze(&s, flow, AnalysisMethod::Sfa),
            Err(AnalysisFailure::EngineInternal(_))
        ));
    }

    #[test]
    fn test_overload_is_unbounded() {
        let mut engine = RateLatencyEngine::new();
        let s = engine
            .create_server("A,B:HIGH", ServiceCurve::new(100.0, 0.0), Multiplexing::Arbitrary)
            .unwrap();
        let small = engine
            .create_flow(ArrivalCurve::token_bucket(10.0, 1.0), &[s])
            .unwrap();
        engine
            .create_flow(ArrivalCurve::token_bucket(120.0, 1.0), &[s])
            .unwrap();
        assert_eq!(
            engine.analyze(&settings(), small, AnalysisMethod::Sfa),
            Err(AnalysisFailure::Unbounded {
                server: "A,B:HIGH".to_string()
            })
        );
    }

    #[test]
    fn test_cyclic_dependency_detected() {
        let mut engine = RateLatencyEngine::new();
        let curve = ServiceCurve::new(200.0, 1.0);
        let a = engine.create_server("A,B:HIGH", curve, Multiplexing::Arbitrary).unwrap();
        let b = engine.create_server("B,A:HIGH", curve, Multiplexing::Arbitrary).unwrap();
        let forward = engine
            .create_flow(ArrivalCurve::token_bucket(10.0, 10.0), &[a, b])
            .unwrap();
        engine
            .create_flow(ArrivalCurve::token_bucket(10.0, 10.0), &[b, a])
            .unwrap();
        let result = engine.analyze(&settings(), forward, AnalysisMethod::Sfa);
        assert!(matches!(result, Err(AnalysisFailure::CyclicDependency(_))));
        assert!(result.unwrap_err().is_structural());
    }

    #[test]
    fn test_structural_errors() {
        let mut engine = RateLatencyEngine::new();
        assert_eq!(
            engine.create_flow(ArrivalCurve::peak_rate(1.0), &[]),
            Err(EngineError::EmptyPath)
        );
        assert_eq!(
            engine.create_flow(ArrivalCurve::peak_rate(1.0), &[ServerHandle(3)]),
            Err(EngineError::UnknownServer(ServerHandle(3)))
        );
        let s = engine
            .create_server("x", ServiceCurve::new(1.0, 0.0), Multiplexing::Fifo)
            .unwrap();
        let f = engine.create_flow(ArrivalCurve::peak_rate(0.5), &[s]).unwrap();
        assert_eq!(engine.remove_server(s), Err(EngineError::ServerInUse(s)));
        engine.remove_flow(f).unwrap();
        assert_eq!(engine.remove_flow(f), Err(EngineError::UnknownFlow(f)));
        engine.remove_server(s).unwrap();
        assert!(engine.servers().is_empty());
    }

    #[test]
    fn test_turns_are_idempotent() {
        let (mut engine, flow) = two_hop(Multiplexing::Arbitrary);
        let path = engine.flow_path(flow).unwrap().to_vec();
        engine.create_turn(path[0], path[1]).unwrap();
        assert_eq!(engine.turn_count(), 1);
        assert!(engine.has_turn(path[0], path[1]));
        assert!(!engine.has_turn(path[1], path[0]));
    }

    #[test]
    fn test_handles_restart_after_emptying() {
        let (mut engine, flow) = two_hop(Multiplexing::Arbitrary);
        let path = engine.flow_path(flow).unwrap().to_vec();
        engine.remove_flow(flow).unwrap();
        for s in path {
            engine.remove_server(s).unwrap();
        }
        assert_eq!(engine.turn_count(), 0);

        let s = engine
            .create_server("again", ServiceCurve::new(1.0, 0.0), Multiplexing::Fifo)
            .unwrap();
        assert_eq!(s, ServerHandle(0));
        let f = engine.create_flow(ArrivalCurve::peak_rate(0.1), &[s]).unwrap();
        assert_eq!(f, FlowHandle(0));
        assert_eq!(engine.path_len(f), Some(1));
    }
}
