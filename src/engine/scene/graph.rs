//! A directed graph of battle states.
//!
//! Every state is a node; edges carry predicates. Each tick the current
//! state updates, then its outgoing edges are checked in the order they were
//! linked and the first one that holds moves the graph along.

use std::{any::Any, collections::BTreeMap, fmt, marker::PhantomData, time::Duration};

use log::info;

use crate::engine::surface::Surface;

pub trait AsAny: Any {
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A phase of the battle. `C` is the shared data every hook works on.
pub trait BattleState<C>: AsAny {
    fn name(&self) -> &'static str;

    fn on_start(&mut self, _ctx: &mut C) {}

    fn on_update(&mut self, ctx: &mut C, elapsed: Duration);

    fn on_end(&mut self, _ctx: &mut C) {}

    fn on_draw(&self, _ctx: &C, _surface: &mut Surface) {}
}

/// A typed handle to a state owned by a [`StateGraph`].
pub struct StateNode<T> {
    index: usize,
    _state: PhantomData<fn() -> T>,
}

impl<T> Clone for StateNode<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StateNode<T> {}

impl<T> fmt::Debug for StateNode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateNode({})", self.index)
    }
}

/// The states of a graph, reachable through their typed handles.
pub struct States<C> {
    nodes: Vec<Box<dyn BattleState<C>>>,
}

impl<C: 'static> States<C> {
    pub fn get<T: BattleState<C>>(&self, node: StateNode<T>) -> &T {
        self.nodes[node.index]
            .as_ref()
            .as_any()
            .downcast_ref()
            .expect("state handles always match their state's type")
    }

    pub fn get_mut<T: BattleState<C>>(&mut self, node: StateNode<T>) -> &mut T {
        self.nodes[node.index]
            .as_mut()
            .as_any_mut()
            .downcast_mut()
            .expect("state handles always match their state's type")
    }

    fn name(&self, index: usize) -> &'static str {
        self.nodes[index].name()
    }
}

type Predicate<C> = Box<dyn FnMut(&mut States<C>, &mut C) -> bool>;

struct Edge<C> {
    to: usize,
    when: Predicate<C>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub from: &'static str,
    pub to: &'static str,
}

pub struct StateGraph<C> {
    states: States<C>,
    edges: BTreeMap<usize, Vec<Edge<C>>>,
    current: Option<usize>,
}

impl<C: 'static> Default for StateGraph<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: 'static> StateGraph<C> {
    pub fn new() -> Self {
        Self {
            states: States { nodes: Vec::new() },
            edges: BTreeMap::new(),
            current: None,
        }
    }

    pub fn add_state<T: BattleState<C>>(&mut self, state: T) -> StateNode<T> {
        self.states.nodes.push(Box::new(state));
        StateNode {
            index: self.states.nodes.len() - 1,
            _state: PhantomData,
        }
    }

    /// Moves from `from` to `to` once `when` holds while `from` is current.
    pub fn link<A, B, F>(&mut self, from: StateNode<A>, to: StateNode<B>, when: F) -> &mut Self
    where
        F: FnMut(&mut States<C>, &mut C) -> bool + 'static,
    {
        self.edges.entry(from.index).or_default().push(Edge {
            to: to.index,
            when: Box::new(when),
        });
        self
    }

    /// Like [`link`](Self::link), for predicates that only look at the source state.
    pub fn change_on<A, B>(&mut self, from: StateNode<A>, to: StateNode<B>, when: fn(&A) -> bool) -> &mut Self
    where
        A: BattleState<C>,
    {
        self.link(from, to, move |states, _| when(states.get(from)))
    }

    /// Chains several edges out of the same state.
    pub fn edges_from<A>(&mut self, from: StateNode<A>) -> EdgeBuilder<'_, C, A> {
        EdgeBuilder { graph: self, from }
    }

    pub fn states(&self) -> &States<C> {
        &self.states
    }

    pub fn states_mut(&mut self) -> &mut States<C> {
        &mut self.states
    }

    pub fn get<T: BattleState<C>>(&self, node: StateNode<T>) -> &T {
        self.states.get(node)
    }

    pub fn get_mut<T: BattleState<C>>(&mut self, node: StateNode<T>) -> &mut T {
        self.states.get_mut(node)
    }

    pub fn current(&self) -> Option<&'static str> {
        self.current.map(|index| self.states.name(index))
    }

    pub fn is_current<T>(&self, node: StateNode<T>) -> bool {
        self.current == Some(node.index)
    }

    pub fn start<T>(&mut self, node: StateNode<T>, ctx: &mut C) {
        info!("stategraph: starting in {}", self.states.name(node.index));
        self.current = Some(node.index);
        self.states.nodes[node.index].on_start(ctx);
    }

    /// Updates the current state and takes at most one transition.
    pub fn tick(&mut self, ctx: &mut C, elapsed: Duration) -> Option<Transition> {
        let current = self.current?;
        self.states.nodes[current].on_update(ctx, elapsed);

        let states = &mut self.states;
        let to = self
            .edges
            .get_mut(&current)?
            .iter_mut()
            .find_map(|edge| (edge.when)(states, ctx).then_some(edge.to))?;
        Some(self.change(current, to, ctx))
    }

    /// Jumps straight to `node`, skipping every predicate.
    pub fn force<T>(&mut self, node: StateNode<T>, ctx: &mut C) -> Option<Transition> {
        let current = self.current?;
        if current == node.index {
            return None;
        }
        Some(self.change(current, node.index, ctx))
    }

    fn change(&mut self, from: usize, to: usize, ctx: &mut C) -> Transition {
        let transition = Transition {
            from: self.states.name(from),
            to: self.states.name(to),
        };
        info!("stategraph: {} -> {}", transition.from, transition.to);
        self.states.nodes[from].on_end(ctx);
        self.current = Some(to);
        self.states.nodes[to].on_start(ctx);
        transition
    }

    pub fn draw(&self, ctx: &C, surface: &mut Surface) {
        if let Some(current) = self.current {
            self.states.nodes[current].on_draw(ctx, surface);
        }
    }
}

pub struct EdgeBuilder<'g, C, A> {
    graph: &'g mut StateGraph<C>,
    from: StateNode<A>,
}

impl<'g, C: 'static, A> EdgeBuilder<'g, C, A> {
    pub fn to<B, F>(self, to: StateNode<B>, when: F) -> Self
    where
        F: FnMut(&mut States<C>, &mut C) -> bool + 'static,
    {
        self.graph.link(self.from, to, when);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Log {
        events: Vec<String>,
        go: bool,
    }

    struct Named {
        name: &'static str,
        ticks: u32,
    }

    impl Named {
        fn new(name: &'static str) -> Self {
            Self { name, ticks: 0 }
        }
    }

    impl BattleState<Log> for Named {
        fn name(&self) -> &'static str {
            self.name
        }

        fn on_start(&mut self, ctx: &mut Log) {
            ctx.events.push(format!("start {}", self.name));
        }

        fn on_update(&mut self, ctx: &mut Log, _elapsed: Duration) {
            self.ticks += 1;
            ctx.events.push(format!("update {}", self.name));
        }

        fn on_end(&mut self, ctx: &mut Log) {
            ctx.events.push(format!("end {}", self.name));
        }
    }

    const TICK: Duration = Duration::from_millis(16);

    #[test]
    fn first_linked_true_edge_wins() {
        let mut graph: StateGraph<Log> = StateGraph::new();
        let a = graph.add_state(Named::new("a"));
        let b = graph.add_state(Named::new("b"));
        let c = graph.add_state(Named::new("c"));
        graph.link(a, b, |_, _| true).link(a, c, |_, _| true);

        let mut log = Log::default();
        graph.start(a, &mut log);
        let taken = graph.tick(&mut log, TICK);
        assert_eq!(taken, Some(Transition { from: "a", to: "b" }));
        assert!(graph.is_current(b));
    }

    #[test]
    fn no_transition_while_predicates_are_false() {
        let mut graph: StateGraph<Log> = StateGraph::new();
        let a = graph.add_state(Named::new("a"));
        let b = graph.add_state(Named::new("b"));
        graph.link(a, b, |_, log: &mut Log| log.go);

        let mut log = Log::default();
        graph.start(a, &mut log);
        for _ in 0..3 {
            assert_eq!(graph.tick(&mut log, TICK), None);
        }
        assert_eq!(graph.get(a).ticks, 3);
        assert_eq!(graph.current(), Some("a"));

        log.go = true;
        assert!(graph.tick(&mut log, TICK).is_some());
        assert_eq!(graph.current(), Some("b"));
    }

    #[test]
    fn hooks_run_update_end_then_start() {
        let mut graph: StateGraph<Log> = StateGraph::new();
        let a = graph.add_state(Named::new("a"));
        let b = graph.add_state(Named::new("b"));
        graph.edges_from(a).to(b, |_, _| true);

        let mut log = Log::default();
        graph.start(a, &mut log);
        graph.tick(&mut log, TICK);
        assert_eq!(log.events, vec!["start a", "update a", "end a", "start b"]);
    }

    #[test]
    fn one_transition_per_tick() {
        let mut graph: StateGraph<Log> = StateGraph::new();
        let a = graph.add_state(Named::new("a"));
        let b = graph.add_state(Named::new("b"));
        let c = graph.add_state(Named::new("c"));
        graph.link(a, b, |_, _| true).link(b, c, |_, _| true);

        let mut log = Log::default();
        graph.start(a, &mut log);
        graph.tick(&mut log, TICK);
        assert!(graph.is_current(b));
        assert_eq!(graph.get(b).ticks, 0);
        graph.tick(&mut log, TICK);
        assert!(graph.is_current(c));
    }

    #[test]
    fn predicates_can_query_other_states() {
        let mut graph: StateGraph<Log> = StateGraph::new();
        let a = graph.add_state(Named::new("a"));
        let b = graph.add_state(Named::new("b"));
        graph.change_on(a, b, |state| state.ticks >= 2);

        let mut log = Log::default();
        graph.start(a, &mut log);
        assert_eq!(graph.tick(&mut log, TICK), None);
        assert!(graph.tick(&mut log, TICK).is_some());

        graph.get_mut(a).ticks = 10;
        graph.link(b, a, move |states, _| states.get(a).ticks == 10);
        assert_eq!(graph.tick(&mut log, TICK), Some(Transition { from: "b", to: "a" }));
    }

    #[test]
    fn force_ignores_predicates() {
        let mut graph: StateGraph<Log> = StateGraph::new();
        let a = graph.add_state(Named::new("a"));
        let b = graph.add_state(Named::new("b"));
        graph.link(a, b, |_, _| false);

        let mut log = Log::default();
        graph.start(a, &mut log);
        assert_eq!(graph.force(b, &mut log), Some(Transition { from: "a", to: "b" }));
        assert_eq!(graph.force(b, &mut log), None);
        assert_eq!(log.events, vec!["start a", "end a", "start b"]);
    }

    #[test]
    fn draw_only_reaches_the_current_state() {
        use ratatui::{buffer::Buffer, layout::Rect};

        struct Painter(&'static str, char);
        impl BattleState<Log> for Painter {
            fn name(&self) -> &'static str {
                self.0
            }
            fn on_update(&mut self, _ctx: &mut Log, _elapsed: Duration) {}
            fn on_draw(&self, _ctx: &Log, surface: &mut Surface) {
                surface.get_mut(0, 0).set_char(self.1);
            }
        }

        let mut graph: StateGraph<Log> = StateGraph::new();
        let a = graph.add_state(Painter("a", 'A'));
        graph.add_state(Painter("b", 'B'));
        let mut log = Log::default();
        graph.start(a, &mut log);

        let mut surface = Buffer::empty(Rect::new(0, 0, 1, 1));
        graph.draw(&log, &mut surface);
        assert_eq!(surface.get(0, 0).symbol(), "A");
    }
}
