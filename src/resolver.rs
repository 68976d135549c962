use std::collections::BTreeSet;

use log::{debug, info};

use crate::callgraph::CallGraph;
use crate::costs::StackCosts;
use crate::{CallChain, Usage};



/// A recursive call path, reported once per function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Recursion
{
    pub function: String,
    /// Function that called `function` again; `None` only if the chain
    /// handed to the resolver was empty.
    pub caller:   Option<String>,
    /// Path up to, but not including, the repeated call.
    pub chain:    CallChain,
}


// A function whose callees are still being explored.
struct Pending<'g>
{
    callees: Vec<&'g str>,
    next:    usize,
    // chain including this function's own frame
    chain:   CallChain,
    best:    Option<Usage>,
}

impl<'g> Pending<'g>
{
    // strictly greater wins, so ties keep the earliest callee in name order
    fn offer(&mut self, usage: Usage)
    {
        if self.best.as_ref().map_or(true, |best| usage.total > best.total)
        {
            self.best = Some(usage);
        }
    }

    fn finish(self) -> Usage
    {
        let Pending { best, chain, .. } = self;
        best.unwrap_or_else(|| Usage::of(chain))
    }
}

enum Step<'g>
{
    Done(Usage),
    Branch(Pending<'g>),
}


///
/// Walks the call graph for the deepest stack path below a function.
///
/// The walk keeps an explicit stack of pending functions instead of
/// recursing natively, so the depth of the analyzed call graph is not
/// bounded by our own stack. A function that reappears on the current path
/// ends that path. The only state kept across calls is the set of
/// functions already reported as recursive; it never affects totals.
///
pub struct Resolver<'g>
{
    graph:       &'g CallGraph,
    costs:       &'g StackCosts,
    bad_symbols: BTreeSet<String>,
    recursions:  Vec<Recursion>,
}

impl<'g> Resolver<'g>
{
    pub fn new(graph: &'g CallGraph, costs: &'g StackCosts) -> Self
    {
        Resolver
        {
            graph,
            costs,
            bad_symbols: BTreeSet::new(),
            recursions:  Vec::new(),
        }
    }

    /// Recursion diagnostics emitted so far, in discovery order.
    pub fn recursions(&self) -> &[Recursion]
    {
        &self.recursions
    }

    /// Functions found to take part in recursion so far.
    pub fn bad_symbols(&self) -> &BTreeSet<String>
    {
        &self.bad_symbols
    }

    pub fn resolve(&mut self, function: &str) -> Usage
    {
        self.resolve_from(function, CallChain::new())
    }

    /// Worst case for `function` when reached through `chain`.
    pub fn resolve_from(&mut self, function: &str, chain: CallChain) -> Usage
    {
        let mut stack: Vec<Pending<'g>> = match self.step(function, chain)
        {
            Step::Done(usage)     => return usage,
            Step::Branch(pending) => vec![pending],
        };

        loop
        {
            let next = stack.last_mut().and_then(|top|
            {
                let callee = *top.callees.get(top.next)?;
                top.next += 1;
                Some((callee, top.chain.clone()))
            });

            match next
            {
                Some((callee, chain)) => match self.step(callee, chain)
                {
                    Step::Branch(pending) => stack.push(pending),
                    Step::Done(usage)     =>
                    {
                        if let Some(top) = stack.last_mut()
                        {
                            top.offer(usage);
                        }
                    }
                },
                None =>
                {
                    let usage = match stack.pop()
                    {
                        Some(done) => done.finish(),
                        None       => unreachable!("the worklist is never empty here"),
                    };

                    match stack.last_mut()
                    {
                        Some(parent) => parent.offer(usage),
                        None         => return usage,
                    }
                }
            }
        }
    }

    ///
    /// Resolves every root and sorts the results by ascending total.
    ///
    /// The sort is stable: roots with equal totals keep their given order.
    ///
    pub fn resolve_all<'n, I>(&mut self, roots: I) -> Vec<(String, Usage)>
    where
        I: IntoIterator<Item = &'n str>,
    {
        let mut results: Vec<(String, Usage)> = roots
            .into_iter()
            .map(|root| (root.to_string(), self.resolve(root)))
            .collect();
        results.sort_by_key(|(_, usage)| usage.total);

        debug!("resolved {} functions", results.len());
        results
    }

    fn step(&mut self, function: &str, chain: CallChain) -> Step<'g>
    {
        if chain.contains(function)
        {
            self.report_recursion(function, &chain);
            return Step::Done(Usage::of(chain));
        }

        // external or library symbol, never seen with a cost
        if !self.costs.contains(function)
        {
            return Step::Done(Usage::of(chain.extended(function, 0)));
        }

        let own = self.costs.lookup(function, &chain);
        let chain = chain.extended(function, own);

        match self.graph.callees(function)
        {
            Some(callees) if !callees.is_empty() => Step::Branch(Pending
            {
                callees,
                next: 0,
                chain,
                best: None,
            }),
            _ => Step::Done(Usage::of(chain)),
        }
    }

    fn report_recursion(&mut self, function: &str, chain: &CallChain)
    {
        if !self.bad_symbols.insert(function.to_string())
        {
            return;
        }

        let caller = chain.last().map(|frame| frame.name.clone());
        info!(
            "recursion detected: `{}` is called from `{}` in this chain: {}",
            function,
            caller.as_deref().unwrap_or("?"),
            chain
        );

        self.recursions.push(Recursion
        {
            function: function.to_string(),
            caller,
            chain:    chain.clone(),
        });
    }
}
