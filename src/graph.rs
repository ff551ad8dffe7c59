//! Graph description, build-time validation/negotiation, and the
//! running graph's push/pull surface.
//!
//! A [`GraphSpec`] is pure data - named nodes plus name-pair edges - so
//! validation runs over the description before a single node is
//! allocated. [`GraphSpec::build`] is fail-fast: any incompatibility
//! aborts the whole construction and no partial graph is ever returned.

use hashbrown::HashMap;
use petgraph::algo::{has_path_connecting, toposort};
use petgraph::graph::NodeIndex;
use tracing::{debug, trace};

use crate::error::{BuildError, RuntimeError};
use crate::frame::{Frame, FrameShape};
use crate::node::{NodeKind, Pull, PushStatus};
use crate::nodes::{ConvertNode, MixerNode, SinkNode, SourceNode};

/// Upper bound on input streams per graph.
pub const MAX_STREAMS: usize = 2;

/// Default sample-groups per frame, as consumed by the pump loop.
pub const FRAME_LEN: usize = 1152;

/// What a named node does in the graph.
#[derive(Clone, Debug)]
pub enum RoleSpec {
    /// Injects externally supplied frames of a fixed shape.
    Source { shape: FrameShape },
    /// Mixes its inputs; `gains_db[i]` applies to the i-th connected
    /// edge (in edge declaration order), which is also the stream index
    /// exposed by [`MixGraph::push`].
    Mixer {
        gains_db: Vec<f32>,
        dropout_transition: usize,
    },
    /// Yields finished frames at the target shape.
    Sink { target: FrameShape },
}

/// A named node in a graph description.
#[derive(Clone, Debug)]
pub struct NodeSpec {
    pub name: String,
    pub role: RoleSpec,
}

impl NodeSpec {
    pub fn source(name: impl Into<String>, shape: FrameShape) -> Self {
        Self {
            name: name.into(),
            role: RoleSpec::Source { shape },
        }
    }

    pub fn mixer(name: impl Into<String>, gains_db: Vec<f32>, dropout_transition: usize) -> Self {
        Self {
            name: name.into(),
            role: RoleSpec::Mixer {
                gains_db,
                dropout_transition,
            },
        }
    }

    pub fn sink(name: impl Into<String>, target: FrameShape) -> Self {
        Self {
            name: name.into(),
            role: RoleSpec::Sink { target },
        }
    }
}

/// A directed edge between two named nodes.
#[derive(Clone, Debug)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
}

impl EdgeSpec {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// A complete graph description, ready to build.
#[derive(Clone, Debug, Default)]
pub struct GraphSpec {
    pub nodes: Vec<NodeSpec>,
    pub edges: Vec<EdgeSpec>,
}

impl GraphSpec {
    /// The classic N-input mix: `in{i} -> mix -> out`, one gain per input.
    ///
    /// # Panics
    ///
    /// Panics if `inputs` and `gains_db` differ in length; arity
    /// validation proper happens in [`build`](Self::build).
    pub fn mix(
        inputs: &[FrameShape],
        gains_db: &[f32],
        dropout_transition: usize,
        target: FrameShape,
    ) -> Self {
        assert_eq!(inputs.len(), gains_db.len());
        let mut spec = GraphSpec::default();
        for (i, &shape) in inputs.iter().enumerate() {
            spec.nodes.push(NodeSpec::source(format!("in{}", i), shape));
            spec.edges.push(EdgeSpec::new(format!("in{}", i), "mix"));
        }
        spec.nodes.push(NodeSpec::mixer(
            "mix",
            gains_db.to_vec(),
            dropout_transition,
        ));
        spec.nodes.push(NodeSpec::sink("out", target));
        spec.edges.push(EdgeSpec::new("mix", "out"));
        spec
    }

    /// Validate the description, negotiate formats, and construct the
    /// running graph.
    pub fn build(self) -> Result<MixGraph, BuildError> {
        let plan = Plan::check(&self)?;
        Ok(plan.instantiate(&self))
    }
}

/// Everything validation learns about a spec, enough to instantiate it.
struct Plan {
    /// Mixer spec index
    mixer: usize,
    /// Sink spec index
    sink: usize,
    /// Source spec indices in stream order (mixer edge order)
    lanes: Vec<usize>,
}

impl Plan {
    fn check(spec: &GraphSpec) -> Result<Plan, BuildError> {
        let mut names: HashMap<&str, usize> = HashMap::new();
        for (i, node) in spec.nodes.iter().enumerate() {
            if names.insert(node.name.as_str(), i).is_some() {
                return Err(BuildError::DuplicateName(node.name.clone()));
            }
        }

        let shape_ok = |shape: &FrameShape| {
            shape.sample_rate > 0 && shape.channels > 0 && shape.frame_len > 0
        };
        let mut sources = Vec::new();
        let mut mixers = Vec::new();
        let mut sinks = Vec::new();
        for (i, node) in spec.nodes.iter().enumerate() {
            match &node.role {
                RoleSpec::Source { shape } => {
                    if !shape_ok(shape) {
                        return Err(BuildError::InvalidShape(node.name.clone()));
                    }
                    sources.push(i);
                }
                RoleSpec::Mixer { .. } => mixers.push(i),
                RoleSpec::Sink { target } => {
                    if !shape_ok(target) {
                        return Err(BuildError::InvalidShape(node.name.clone()));
                    }
                    sinks.push(i);
                }
            }
        }
        if sources.is_empty() {
            return Err(BuildError::NoSources);
        }
        if sources.len() > MAX_STREAMS {
            return Err(BuildError::TooManyStreams(sources.len()));
        }
        let mixer = match mixers.as_slice() {
            [] => return Err(BuildError::NoMixer),
            [one] => *one,
            _ => return Err(BuildError::MultipleMixers),
        };
        let sink = match sinks.as_slice() {
            [] => return Err(BuildError::NoSink),
            [one] => *one,
            _ => return Err(BuildError::MultipleSinks),
        };

        // Shadow graph over spec indices, for cycle and path queries.
        let mut dag = petgraph::graph::Graph::<usize, ()>::new();
        let indices: Vec<NodeIndex> = (0..spec.nodes.len()).map(|i| dag.add_node(i)).collect();
        let mut lanes = Vec::new();
        for edge in &spec.edges {
            let from = *names
                .get(edge.from.as_str())
                .ok_or_else(|| BuildError::UnknownNode(edge.from.clone()))?;
            let to = *names
                .get(edge.to.as_str())
                .ok_or_else(|| BuildError::UnknownNode(edge.to.clone()))?;
            dag.add_edge(indices[from], indices[to], ());
            // Edge order into the mixer defines the stream index.
            if to == mixer {
                lanes.push(from);
            }
        }
        if toposort(&dag, None).is_err() {
            return Err(BuildError::NotADag);
        }

        // Per-role degree constraints: sources feed exactly one consumer
        // and take no input; the mixer drains only sources and feeds only
        // the sink; the sink is terminal.
        for &i in &sources {
            let node = &spec.nodes[i];
            let out: Vec<_> = dag.neighbors(indices[i]).collect();
            let ins = dag
                .neighbors_directed(indices[i], petgraph::Direction::Incoming)
                .count();
            if ins != 0 || out.len() != 1 || dag[out[0]] != mixer {
                return Err(BuildError::BadEdge(node.name.clone()));
            }
        }
        let mixer_node = &spec.nodes[mixer];
        let declared = match &mixer_node.role {
            RoleSpec::Mixer { gains_db, .. } => gains_db.len(),
            _ => unreachable!(),
        };
        if !lanes.iter().all(|&l| sources.contains(&l)) {
            return Err(BuildError::BadEdge(mixer_node.name.clone()));
        }
        if lanes.len() != declared {
            return Err(BuildError::MixerArityMismatch {
                declared,
                connected: lanes.len(),
            });
        }
        let mixer_out: Vec<_> = dag.neighbors(indices[mixer]).collect();
        if mixer_out.len() != 1 || dag[mixer_out[0]] != sink {
            return Err(BuildError::BadEdge(mixer_node.name.clone()));
        }
        if dag.neighbors(indices[sink]).count() != 0 {
            return Err(BuildError::BadEdge(spec.nodes[sink].name.clone()));
        }

        for &i in &sources {
            if !has_path_connecting(&dag, indices[i], indices[sink], None) {
                return Err(BuildError::UnreachableSink(spec.nodes[i].name.clone()));
            }
        }

        // Common sample format across the whole chain.
        let target = match &spec.nodes[sink].role {
            RoleSpec::Sink { target } => *target,
            _ => unreachable!(),
        };
        for &i in &sources {
            let shape = match &spec.nodes[i].role {
                RoleSpec::Source { shape } => *shape,
                _ => unreachable!(),
            };
            if shape.format != target.format {
                return Err(BuildError::FormatMismatch(spec.nodes[i].name.clone()));
            }
        }

        Ok(Plan { mixer, sink, lanes })
    }

    /// Allocate the arena. Negotiation fixes the mixer's output shape to
    /// the sink target and slips a converter onto any lane whose declared
    /// rate or layout differs.
    fn instantiate(self, spec: &GraphSpec) -> MixGraph {
        let target = match &spec.nodes[self.sink].role {
            RoleSpec::Sink { target } => *target,
            _ => unreachable!(),
        };
        let (gains_db, transition) = match &spec.nodes[self.mixer].role {
            RoleSpec::Mixer {
                gains_db,
                dropout_transition,
            } => (gains_db.clone(), *dropout_transition),
            _ => unreachable!(),
        };
        debug!(%target, "negotiated mixer output shape");

        let mut arena = petgraph::graph::Graph::new();
        let mixer = arena.add_node(NodeKind::Mixer(MixerNode::new(
            &gains_db, transition, target,
        )));
        let sink = arena.add_node(NodeKind::Sink(SinkNode::new(target)));
        arena.add_edge(mixer, sink, ());

        let mut sources = Vec::new();
        let mut converters = Vec::new();
        for &lane in &self.lanes {
            let (name, shape) = match &spec.nodes[lane] {
                NodeSpec {
                    name,
                    role: RoleSpec::Source { shape },
                } => (name, *shape),
                _ => unreachable!(),
            };
            let source = arena.add_node(NodeKind::Source(SourceNode::new(shape)));
            if shape.sample_rate != target.sample_rate || shape.channels != target.channels {
                debug!(source = %name, from = %shape, to = %target, "inserting format converter");
                let convert = arena.add_node(NodeKind::Convert(ConvertNode::new(
                    shape,
                    target.sample_rate,
                    target.channels,
                )));
                arena.add_edge(source, convert, ());
                arena.add_edge(convert, mixer, ());
                converters.push(Some(convert));
            } else {
                arena.add_edge(source, mixer, ());
                converters.push(None);
            }
            sources.push(source);
        }

        MixGraph {
            arena,
            sources,
            converters,
            mixer,
            sink,
        }
    }
}

/// A validated, running mix graph.
///
/// Owns every node exclusively; the edge set is fixed at build time.
/// All operations are non-blocking - "not currently possible" comes back
/// as a status ([`PushStatus::Rejected`], [`Pull::NotReady`]), never as
/// a blocked call, so a round-robin driver cannot deadlock.
#[derive(Debug)]
pub struct MixGraph {
    arena: petgraph::graph::Graph<NodeKind, ()>,
    /// Source arena indices in stream order
    sources: Vec<NodeIndex>,
    /// Implicit converter per stream, where negotiation inserted one
    converters: Vec<Option<NodeIndex>>,
    mixer: NodeIndex,
    sink: NodeIndex,
}

impl MixGraph {
    /// Number of input streams.
    #[inline]
    pub fn input_count(&self) -> usize {
        self.sources.len()
    }

    /// Declared frame shape of one input stream.
    pub fn input_shape(&self, stream: usize) -> Option<FrameShape> {
        let &idx = self.sources.get(stream)?;
        match &self.arena[idx] {
            NodeKind::Source(s) => Some(s.shape()),
            _ => None,
        }
    }

    /// Shape of every frame the sink yields.
    pub fn output_shape(&self) -> FrameShape {
        match &self.arena[self.sink] {
            NodeKind::Sink(s) => s.target(),
            _ => unreachable!("sink index always points at the sink"),
        }
    }

    /// Push one frame into an input stream.
    ///
    /// `Rejected` carries the frame back and means "drain the sink
    /// first"; it is not an error. Shape mismatches and pushes past
    /// end-of-data are errors.
    pub fn push(&mut self, stream: usize, frame: Frame) -> Result<PushStatus, RuntimeError> {
        if stream >= self.sources.len() {
            return Err(RuntimeError::NoSuchInput(stream));
        }
        trace!(stream, "push");
        let status = self.source_mut(stream).push(frame)?;
        self.advance();
        Ok(status)
    }

    /// Declare an input stream's external data exhausted.
    pub fn end_input(&mut self, stream: usize) -> Result<(), RuntimeError> {
        if stream >= self.sources.len() {
            return Err(RuntimeError::NoSuchInput(stream));
        }
        debug!(stream, "input stream ended");
        self.source_mut(stream).mark_ended();
        self.advance();
        Ok(())
    }

    /// Pull the next finished frame, if one is buffered.
    pub fn pull(&mut self) -> Pull {
        self.advance();
        match &mut self.arena[self.sink] {
            NodeKind::Sink(s) => s.pull(),
            _ => unreachable!("sink index always points at the sink"),
        }
    }

    /// Move data as far through the graph as it can currently go:
    /// source queues into the mixer (through converters), mixed frames
    /// into the sink, and the ended flag once the mix is over.
    fn advance(&mut self) {
        for stream in 0..self.sources.len() {
            loop {
                let ended = self.source_ref(stream).is_ended();
                if !(self.mixer_ref().wants_input(stream) || ended) {
                    break;
                }
                let frame = match self.source_mut(stream).pop_frame() {
                    Some(frame) => frame,
                    None => break,
                };
                let samples = match self.converters[stream] {
                    Some(idx) => match &mut self.arena[idx] {
                        NodeKind::Convert(c) => c.convert(&frame),
                        _ => unreachable!("converter index always points at a converter"),
                    },
                    None => frame.samples().to_vec(),
                };
                self.mixer_mut().feed(stream, &samples);
            }
            if self.source_ref(stream).is_ended() && self.source_ref(stream).queued() == 0 {
                self.mixer_mut().input_ended(stream);
            }
        }

        while let Some(frame) = self.mixer_mut().mix_frame() {
            trace!("mixed one output frame");
            match &mut self.arena[self.sink] {
                NodeKind::Sink(s) => s.push_frame(frame),
                _ => unreachable!("sink index always points at the sink"),
            }
        }
        if self.mixer_ref().ended() {
            match &mut self.arena[self.sink] {
                NodeKind::Sink(s) => s.mark_ended(),
                _ => unreachable!("sink index always points at the sink"),
            }
        }
    }

    fn source_ref(&self, stream: usize) -> &SourceNode {
        match &self.arena[self.sources[stream]] {
            NodeKind::Source(s) => s,
            other => unreachable!("stream index points at a {}", other.role_name()),
        }
    }

    fn source_mut(&mut self, stream: usize) -> &mut SourceNode {
        match &mut self.arena[self.sources[stream]] {
            NodeKind::Source(s) => s,
            other => unreachable!("stream index points at a {}", other.role_name()),
        }
    }

    fn mixer_ref(&self) -> &MixerNode {
        match &self.arena[self.mixer] {
            NodeKind::Mixer(m) => m,
            other => unreachable!("mixer index points at a {}", other.role_name()),
        }
    }

    fn mixer_mut(&mut self) -> &mut MixerNode {
        match &mut self.arena[self.mixer] {
            NodeKind::Mixer(m) => m,
            other => unreachable!("mixer index points at a {}", other.role_name()),
        }
    }
}
