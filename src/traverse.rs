//! The leaf enumeration driver.
//!
//! [`traverse`] runs a suite body repeatedly, once per leaf of its section
//! tree. Every run follows the path the previous run discovered, and the loop
//! ends when a run discovers nothing new or a required assertion failed.
//! All runs of one invocation log into the same [`ResultTree`] below a single
//! root scope.

use std::panic::{self, AssertUnwindSafe, Location};

use tracing::{debug, trace};

use crate::{
    context::{Context, SuiteEnv},
    path::PathStack,
    result::ResultTree,
};

/// Run `body` until every leaf of its section tree was visited once.
///
/// The returned tree is closed and synced.
///
/// # Panics
/// Panics raised by `body` are logged and resumed after the innermost open
/// scope was named. This includes [`TraversalError`](crate::error::TraversalError)s.
pub fn traverse<F>(
    name: &str,
    location: &'static Location<'static>,
    params: Vec<String>,
    env: &SuiteEnv,
    body: F,
) -> ResultTree
where
    F: Fn(&mut Context),
{
    let mut ctx = Context::new(name, env.clone());
    ctx.tree
        .scope_open(name, PathStack::new(), location, params);

    let mut runs = 0usize;
    loop {
        ctx.begin_run();
        trace!(suite = name, run = runs, pinned = %ctx.pinned, "starting leaf run");
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| body(&mut ctx))) {
            ctx.log_panic(name, payload.as_ref());
            panic::resume_unwind(payload);
        }
        runs += 1;

        ctx.check_consistency();
        if !ctx.has_next() {
            break;
        }
    }

    let fatal = ctx.is_fatal();
    let mut tree = ctx.into_tree();
    tree.scope_close();
    tree.sync();
    debug!(suite = name, runs, fatal, tally = ?tree.tally(), "traversal finished");
    tree
}
