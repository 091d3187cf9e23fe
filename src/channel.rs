//! The argument/result taint channel.
//!
//! Scalar call arguments and results have no address, so their taint crosses a
//! host/module call through a small slot array instead of the shadow memory.
//! The caller fills the argument slots before the call; the callee reads them,
//! prepares the result slots and fills them before returning; the caller reads
//! the result slots after the call returns.

use crate::error::TaintError;

/// Number of argument slots and of result slots.
pub const CHANNEL_CAPACITY: usize = 8;

/// Access to a taint channel, wherever it lives.
///
/// [`TaintChannel`] is the in-process channel; the interop adapter provides a
/// port that forwards to a module's channel exports.
pub trait ChannelPort {
    /// Callee side: taint of the caller's argument `index`.
    fn get_argument_taint(&mut self, index: u32) -> anyhow::Result<bool>;
    /// Callee side: resets the first `count` result slots to untainted.
    fn prepare_for_result_taints(&mut self, count: u32) -> anyhow::Result<()>;
    /// Callee side: sets the taint of result `index`.
    fn set_result_taint(&mut self, index: u32, flag: bool) -> anyhow::Result<()>;
}

/// A port that is not wired to any channel yet.
///
/// Every access fails with [`TaintError::UnboundImportInvocation`] so a missing
/// binding shows up at the first call instead of silently reading untainted.
#[derive(Debug, Clone)]
pub struct UnboundPort {
    pub import: String,
}
impl ChannelPort for UnboundPort {
    fn get_argument_taint(&mut self, _index: u32) -> anyhow::Result<bool> {
        Err(TaintError::unbound(self.import.clone()).into())
    }
    fn prepare_for_result_taints(&mut self, _count: u32) -> anyhow::Result<()> {
        Err(TaintError::unbound(self.import.clone()).into())
    }
    fn set_result_taint(&mut self, _index: u32, _flag: bool) -> anyhow::Result<()> {
        Err(TaintError::unbound(self.import.clone()).into())
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Slots {
    flags: [bool; CHANNEL_CAPACITY],
    count: usize,
}
impl Slots {
    fn get(&self, index: u32) -> bool {
        let index = index as usize;
        index < self.count && self.flags[index]
    }
    fn prepare(&mut self, count: u32) {
        let count = count as usize;
        if count > CHANNEL_CAPACITY {
            tracing::warn!(count, capacity = CHANNEL_CAPACITY, "channel prepared past its capacity");
        }
        self.flags = [false; CHANNEL_CAPACITY];
        self.count = count.min(CHANNEL_CAPACITY);
    }
    fn set(&mut self, index: u32, flag: bool, side: &str) {
        let i = index as usize;
        if i >= self.count {
            tracing::warn!(index, prepared = self.count, side, "dropping taint for an unprepared slot");
            return;
        }
        self.flags[i] = flag;
    }
}

/// In-process channel with fixed capacity.
///
/// Each call goes through [`TaintChannel::begin_call`] and
/// [`TaintChannel::finish_call`], which wipe the slots so no flag outlives the
/// call that wrote it.
#[derive(Debug, Clone, Default)]
pub struct TaintChannel {
    args: Slots,
    results: Slots,
    in_call: bool,
}
impl TaintChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caller side: publishes argument taints and clears the result slots.
    pub fn begin_call(&mut self, arg_taints: &[bool]) {
        if self.in_call {
            tracing::warn!("channel reused before the previous call finished");
        }
        if arg_taints.len() > CHANNEL_CAPACITY {
            tracing::warn!(args = arg_taints.len(), capacity = CHANNEL_CAPACITY, "arguments past the channel capacity are untainted");
        }
        self.args.prepare(arg_taints.len() as u32);
        for (i, flag) in arg_taints.iter().take(CHANNEL_CAPACITY).enumerate() {
            self.args.flags[i] = *flag;
        }
        self.results = Slots::default();
        self.in_call = true;
    }

    /// Caller side: reads `count` result taints and resets the channel.
    ///
    /// Results the callee never prepared read as untainted.
    pub fn finish_call(&mut self, count: usize) -> Vec<bool> {
        let taints = (0..count as u32).map(|i| self.results.get(i)).collect();
        *self = Self::default();
        taints
    }

    /// Caller side: taint of result `index` without ending the call.
    pub fn get_result_taint(&self, index: u32) -> bool {
        self.results.get(index)
    }

    /// Caller side: sets one argument slot, extending the prepared count.
    pub fn set_argument_taint(&mut self, index: u32, flag: bool) {
        let i = index as usize;
        if i >= CHANNEL_CAPACITY {
            tracing::warn!(index, capacity = CHANNEL_CAPACITY, "dropping taint for an argument past the channel capacity");
            return;
        }
        self.args.count = self.args.count.max(i + 1);
        self.args.flags[i] = flag;
    }
}
impl ChannelPort for TaintChannel {
    fn get_argument_taint(&mut self, index: u32) -> anyhow::Result<bool> {
        Ok(self.args.get(index))
    }
    fn prepare_for_result_taints(&mut self, count: u32) -> anyhow::Result<()> {
        self.results.prepare(count);
        Ok(())
    }
    fn set_result_taint(&mut self, index: u32, flag: bool) -> anyhow::Result<()> {
        self.results.set(index, flag, "result");
        Ok(())
    }
}
