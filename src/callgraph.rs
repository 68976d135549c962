use std::collections::BTreeMap;

use log::{debug, trace};
use petgraph::{
    algo,
    graph::{DiGraph, NodeIndex},
    Direction,
};

use crate::arch::Isa;
use crate::symbols::SymbolTable;



/// Local stack bytes per function as read from the entry-frame adjustment.
pub type BaselineCosts = BTreeMap<String, u64>;


#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function
{
    pub name:    String,
    /// Seen as a label in the disassembly. Call targets that never were
    /// (library and external symbols) are kept as undefined nodes.
    pub defined: bool,
}


///
/// Statically visible calls between the functions of a binary.
///
/// Indirect calls name no target and so never show up here.
///
#[derive(Clone, Debug, Default)]
pub struct CallGraph
{
    pub g:       DiGraph<Function, ()>,
    pub indices: BTreeMap<String, NodeIndex>,
}

impl CallGraph
{
    pub fn new() -> Self
    {
        CallGraph::default()
    }

    fn node(&mut self, name: &str) -> NodeIndex
    {
        if let Some(idx) = self.indices.get(name)
        {
            return *idx;
        }

        let idx = self.g.add_node(Function { name: name.to_string(), defined: false });
        self.indices.insert(name.to_string(), idx);
        idx
    }

    /// Registers `name` as a function of this binary. Calls recorded so far
    /// are kept.
    pub fn define(&mut self, name: &str) -> NodeIndex
    {
        let idx = self.node(name);
        self.g[idx].defined = true;
        idx
    }

    pub fn add_call(&mut self, caller: &str, callee: &str)
    {
        let caller = self.define(caller);
        let callee = self.node(callee);
        self.g.update_edge(caller, callee, ());
    }

    pub fn is_defined(&self, name: &str) -> bool
    {
        self.indices.get(name).map_or(false, |idx| self.g[*idx].defined)
    }

    ///
    /// Sorted, de-duplicated callees of `name`.
    ///
    /// `None` when `name` was never defined in the binary, as opposed to
    /// `Some(vec![])` for a defined function that calls nothing.
    ///
    pub fn callees(&self, name: &str) -> Option<Vec<&str>>
    {
        let idx = *self.indices.get(name)?;
        if !self.g[idx].defined
        {
            return None;
        }

        let mut callees: Vec<&str> = self.g
            .neighbors_directed(idx, Direction::Outgoing)
            .map(|n| self.g[n].name.as_str())
            .collect();
        callees.sort_unstable();
        callees.dedup();
        Some(callees)
    }

    /// Defined functions, in name order.
    pub fn functions(&self) -> impl Iterator<Item = &str>
    {
        self.indices
            .iter()
            .filter(move |(_, idx)| self.g[**idx].defined)
            .map(|(name, _)| name.as_str())
    }

    ///
    /// Groups of functions that can reach themselves: strongly connected
    /// components with more than one member, or a single self-calling
    /// function. Names are sorted inside each group and groups by their
    /// first name.
    ///
    pub fn recursive_groups(&self) -> Vec<Vec<&str>>
    {
        let mut groups: Vec<Vec<&str>> = algo::tarjan_scc(&self.g)
            .into_iter()
            .filter(|scc|
            {
                scc.len() > 1 || self.g.contains_edge(scc[0], scc[0])
            })
            .map(|scc|
            {
                let mut names: Vec<&str> = scc.iter().map(|n| self.g[*n].name.as_str()).collect();
                names.sort_unstable();
                names
            })
            .collect();
        groups.sort();
        groups
    }

    ///
    /// Builds the call graph and baseline costs from `objdump -d` output.
    ///
    /// Each label starts a function with a cost of 0. While the current
    /// instruction lies inside the symbol's extent, call targets are added
    /// as callees and stack adjustments are summed into the cost, but only
    /// until the first call: later adjustments belong to cleanup code.
    ///
    pub fn from_disassembly<'l, I>(lines: I, symbols: &SymbolTable, isa: &Isa)
        -> (CallGraph, BaselineCosts)
    where
        I: IntoIterator<Item = &'l str>,
    {
        let mut graph = CallGraph::new();
        let mut baseline = BaselineCosts::new();

        let mut current: Option<String> = None;
        let mut inside_body = false;
        let mut found_first_call = false;

        for line in lines
        {
            // leave the body once we run past the symbol's extent
            if let (Some(name), Some(offset)) = (current.as_deref(), isa.instruction_offset(line))
            {
                if let Some(sym) = symbols.get(name)
                {
                    inside_body = inside_body && sym.contains(offset);
                }
            }

            if let Some((offset, name)) = isa.function_label(line)
            {
                trace!("function `{}` at {:#x}", name, offset);
                graph.define(name);
                baseline.insert(name.to_string(), 0);
                current = Some(name.to_string());
                inside_body = true;
                found_first_call = false;
            }

            let name = match current.as_deref()
            {
                Some(name) if inside_body => name,
                _                         => continue,
            };

            if let Some(target) = isa.call_target(line)
            {
                trace!("`{}` calls `{}`", name, target);
                found_first_call = true;
                graph.add_call(name, target);
            }

            if !found_first_call
            {
                if let Some(bytes) = isa.stack_adjustment(line)
                {
                    trace!("`{}` adjusts the stack by {} bytes", name, bytes);
                    let cost = baseline.entry(name.to_string()).or_insert(0);
                    *cost = cost.saturating_add(bytes);
                }
            }
        }

        debug!(
            "call graph: {} functions, {} calls",
            graph.functions().count(),
            graph.g.edge_count()
        );
        (graph, baseline)
    }
}
