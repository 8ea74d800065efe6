//! Host-shared output buffers.
//!
//! The host supplies (or asks us to allocate) the five output arrays and
//! reads them back between steps; the shape contract is validated exactly
//! once, at attach time.  Nothing here is touched concurrently — `step()`
//! has exclusive ownership for its whole duration.

use crate::error::{EnvError, EnvResult};

/// The per-step output arrays plus the host-written action array.
pub struct Buffers {
    /// `num_agents × num_tokens × 3`, C-contiguous.
    pub observations: Vec<u8>,
    pub terminals: Vec<bool>,
    pub truncations: Vec<bool>,
    pub rewards: Vec<f32>,
    /// Host-written: one wire action per agent per step.
    pub actions: Vec<i32>,
    /// Optional second action channel carrying vibe selections.
    pub vibe_actions: Option<Vec<i32>>,
}

impl Buffers {
    /// Allocate a zeroed buffer set of the right shape.
    pub fn allocate(num_agents: usize, num_tokens: usize) -> Self {
        Self {
            observations: vec![0; num_agents * num_tokens * 3],
            terminals: vec![false; num_agents],
            truncations: vec![false; num_agents],
            rewards: vec![0.0; num_agents],
            actions: vec![0; num_agents],
            vibe_actions: None,
        }
    }

    /// Check every array against the environment's shape.
    pub fn validate(&self, num_agents: usize, num_tokens: usize) -> EnvResult<()> {
        let check = |what: &'static str, got: usize, expected: usize| {
            if got == expected {
                Ok(())
            } else {
                Err(EnvError::BufferShape {
                    what,
                    expected,
                    got,
                })
            }
        };
        check(
            "observations",
            self.observations.len(),
            num_agents * num_tokens * 3,
        )?;
        check("terminals", self.terminals.len(), num_agents)?;
        check("truncations", self.truncations.len(), num_agents)?;
        check("rewards", self.rewards.len(), num_agents)?;
        check("actions", self.actions.len(), num_agents)?;
        if let Some(v) = &self.vibe_actions {
            check("vibe_actions", v.len(), num_agents)?;
        }
        Ok(())
    }

    /// One agent's observation row.
    #[inline]
    pub fn obs_row_mut(&mut self, agent: usize, num_tokens: usize) -> &mut [u8] {
        let stride = num_tokens * 3;
        &mut self.observations[agent * stride..(agent + 1) * stride]
    }

    #[inline]
    pub fn obs_row(&self, agent: usize, num_tokens: usize) -> &[u8] {
        let stride = num_tokens * 3;
        &self.observations[agent * stride..(agent + 1) * stride]
    }
}
