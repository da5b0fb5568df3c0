// Copyright 2024-2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// In-memory trace model. The sparse value changes of a VCD are expanded into one complete
// snapshot per time step, which is what the renderer walks over.

use crate::vcd::{DeclarationCmd, SimulationCmd, VcdFile, VcdHeader};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};

pub type Time = u64;

/// Separates the scopes and the variable name in a fully qualified signal name.
pub const SCOPE_SEPARATOR: char = ' ';

/// Values of all signals that have been assigned up to a point in time, by signal name.
pub type Snapshot = FxHashMap<String, String>;

/// Maps the short identifier codes used in the VCD body to fully qualified signal names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalDeclarations {
    by_code: FxHashMap<String, String>,
}

impl SignalDeclarations {
    pub fn get(&self, code: &str) -> Option<&str> {
        self.by_code.get(code).map(|n| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_code.iter().map(|(c, n)| (c.as_str(), n.as_str()))
    }

    /// A second declaration of the same code replaces the first one.
    fn insert(&mut self, code: String, name: String) {
        self.by_code.insert(code, name);
    }
}

/// Ordered snapshots by simulation time. There is always a snapshot at time 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    snapshots: BTreeMap<Time, Snapshot>,
}

impl Default for Timeline {
    fn default() -> Self {
        let mut snapshots = BTreeMap::new();
        snapshots.insert(0, Snapshot::default());
        Self { snapshots }
    }
}

impl Timeline {
    /// Number of distinct time steps.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Never true, the baseline snapshot at time 0 always exists.
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// All time steps in ascending order.
    pub fn times(&self) -> impl Iterator<Item = Time> + '_ {
        self.snapshots.keys().copied()
    }

    pub fn max_time(&self) -> Time {
        self.snapshots.keys().next_back().copied().unwrap_or_default()
    }

    pub fn get(&self, time: Time) -> Option<&Snapshot> {
        self.snapshots.get(&time)
    }

    pub fn value_at(&self, time: Time, signal: &str) -> Option<&str> {
        self.get(time)?.get(signal).map(|v| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Time, &Snapshot)> {
        self.snapshots.iter().map(|(t, s)| (*t, s))
    }
}

/// How a value is drawn.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SignalKind {
    /// exactly `0` or `1`
    Wire,
    /// everything else, including single bit `x` or `z`
    Bus,
}

impl SignalKind {
    pub fn of(value: &str) -> Self {
        match value {
            "0" | "1" => SignalKind::Wire,
            _ => SignalKind::Bus,
        }
    }
}

/// A fully reconstructed trace, ready to be rendered.
#[derive(Debug, Clone)]
pub struct Trace {
    name: String,
    header: VcdHeader,
    declarations: SignalDeclarations,
    timeline: Timeline,
    signals: Vec<String>,
}

impl Trace {
    /// Reconstructs the per time step signal values from a parsed VCD.
    pub fn from_vcd(name: impl Into<String>, file: &VcdFile) -> Self {
        let mut builder = TimelineBuilder::default();
        for cmd in file.declarations.iter() {
            builder.declare(cmd);
        }
        for cmd in file.simulation.iter() {
            builder.simulate(cmd);
        }
        let (declarations, timeline, signals) = builder.finish();
        let name = name.into();
        tracing::debug!(
            trace = %name,
            declarations = declarations.len(),
            time_steps = timeline.len(),
            signals = signals.len(),
            "reconstructed timeline"
        );
        Self {
            name,
            header: file.header.clone(),
            declarations,
            timeline,
            signals,
        }
    }

    /// Label the trace was loaded with, usually the file name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn header(&self) -> &VcdHeader {
        &self.header
    }

    pub fn declarations(&self) -> &SignalDeclarations {
        &self.declarations
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Sorted and deduplicated names of every signal that has a value at some time.
    pub fn signals(&self) -> &[String] {
        &self.signals
    }
}

#[derive(Debug, Default)]
struct TimelineBuilder {
    scopes: Vec<String>,
    declarations: SignalDeclarations,
    timeline: Timeline,
    current: Time,
}

impl TimelineBuilder {
    fn declare(&mut self, cmd: &DeclarationCmd) {
        match cmd {
            DeclarationCmd::Scope { name, .. } => self.scopes.push(name.clone()),
            DeclarationCmd::UpScope => {
                if self.scopes.pop().is_none() {
                    tracing::warn!("ignoring `$upscope` outside of any scope");
                }
            }
            DeclarationCmd::Var { code, name, .. } => {
                let full_name = self.full_name(name);
                self.declarations.insert(code.clone(), full_name);
            }
        }
    }

    fn full_name(&self, name: &str) -> String {
        let mut out = String::with_capacity((self.scopes.len() + 1) * 8);
        for scope in self.scopes.iter() {
            out.push_str(scope);
            out.push(SCOPE_SEPARATOR);
        }
        out.push_str(name);
        out
    }

    fn simulate(&mut self, cmd: &SimulationCmd) {
        match cmd {
            SimulationCmd::Time(time) => self.time_change(*time),
            SimulationCmd::ScalarChange { code, value }
            | SimulationCmd::VectorChange { code, value } => self.value_change(code, value),
        }
    }

    fn time_change(&mut self, time: Time) {
        if time < self.current {
            tracing::warn!(
                time,
                current = self.current,
                "ignoring time step that goes back in time"
            );
            return;
        }
        if time == self.current {
            return;
        }
        // every new snapshot starts out as an independent copy of its predecessor
        let previous = self.timeline.get(self.current).cloned().unwrap_or_default();
        self.timeline.snapshots.insert(time, previous);
        self.current = time;
    }

    fn value_change(&mut self, code: &str, value: &str) {
        let Some(name) = self.declarations.get(code) else {
            tracing::warn!(code, "ignoring value change of undeclared signal");
            return;
        };
        let snapshot = self.timeline.snapshots.entry(self.current).or_default();
        snapshot.insert(name.to_string(), value.to_string());
    }

    fn finish(self) -> (SignalDeclarations, Timeline, Vec<String>) {
        let signals: BTreeSet<&String> = self
            .timeline
            .snapshots
            .values()
            .flat_map(|s| s.keys())
            .collect();
        let signals = signals.into_iter().cloned().collect();
        (self.declarations, self.timeline, signals)
    }
}
