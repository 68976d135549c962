use std::collections::BTreeMap;

use log::debug;

use crate::callgraph::BaselineCosts;
use crate::su::{Origin, OriginCosts, StackUsage};
use crate::CallChain;



///
/// Local stack cost of every known function.
///
/// `best` holds one conservative figure per name. `origins` keeps the
/// per-file figures so that a file-local function can be charged what its
/// own translation unit reported.
///
#[derive(Clone, Debug, Default)]
pub struct StackCosts
{
    best:    BTreeMap<String, u64>,
    origins: OriginCosts,
}

impl StackCosts
{
    pub fn new(best: BTreeMap<String, u64>, origins: OriginCosts) -> Self
    {
        StackCosts { best, origins }
    }

    /// Baseline costs from the disassembly, raised to the `.su` figure
    /// wherever that one is larger.
    pub fn merge(baseline: BaselineCosts, su: &StackUsage) -> Self
    {
        let mut best = baseline;
        for (name, bytes) in &su.best
        {
            let cost = best.entry(name.clone()).or_insert(0);
            *cost = (*cost).max(*bytes);
        }

        debug!("{} functions with a known stack cost", best.len());
        StackCosts::new(best, su.origins.clone())
    }

    pub fn best(&self, name: &str) -> Option<u64>
    {
        self.best.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool
    {
        self.best.contains_key(name)
    }

    /// Every function with a cost, in name order.
    pub fn functions(&self) -> impl Iterator<Item = &str>
    {
        self.best.keys().map(String::as_str)
    }

    /// `functions`, restricted to `wanted` unless that is empty. Names in
    /// `wanted` without a cost are left out.
    pub fn select<'s>(&'s self, wanted: &[String]) -> Vec<&'s str>
    {
        self.functions()
            .filter(|name| wanted.is_empty() || wanted.iter().any(|w| w == name))
            .collect()
    }

    pub fn origins_of(&self, name: &str) -> &[(Origin, u64)]
    {
        self.origins.get(name).map_or(&[][..], Vec::as_slice)
    }

    ///
    /// Cost of calling `name` at the end of `chain`.
    ///
    /// When `name` has per-file figures, the immediate caller's first
    /// recorded origin picks among them: a same-named function in the
    /// caller's own file is assumed to be the one called. In every other
    /// case the conservative `best` figure is used.
    ///
    pub fn lookup(&self, name: &str, chain: &CallChain) -> u64
    {
        let fallback = self.best(name).unwrap_or(0);

        let own = self.origins_of(name);
        if chain.is_empty() || own.is_empty()
        {
            return fallback;
        }

        let caller_origin = match chain.last().and_then(|caller| self.origins_of(&caller.name).first())
        {
            Some((origin, _)) => origin,
            None              => return fallback,
        };

        own.iter()
            .find(|(origin, _)| origin == caller_origin)
            .map_or(fallback, |(_, bytes)| *bytes)
    }
}
