//! Compact digital-input bank for switch roles (§4.7, §6).
//!
//! A trimmed stand-in for a full role-based I/O registry: this spec
//! only ever needs a handful of boolean switches (e-stop, per-axis
//! limit/home, probe, stall), so a flat bit bank plus a role→index map
//! is enough, instead of the heavier validated role registry this was
//! grounded on.

use std::collections::HashMap;

use super::role::{DiLogic, IoRole};

/// One switch binding: its bit position in the bank and its logic sense.
#[derive(Debug, Clone, Copy)]
struct Binding {
    bit: u16,
    logic: DiLogic,
}

/// A bank of boolean switch inputs addressed by [`IoRole`].
///
/// `read` applies the configured [`DiLogic`] so callers always see
/// "true == switch engaged" regardless of wiring polarity.
#[derive(Debug, Default)]
pub struct SwitchBank {
    bindings: HashMap<IoRole, Binding>,
    bits: u64,
}

impl SwitchBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a role to a bit position with the given logic sense.
    pub fn bind(&mut self, role: IoRole, bit: u16, logic: DiLogic) {
        self.bindings.insert(role, Binding { bit, logic });
    }

    /// Set the raw (pre-logic) state of a bit, as read from hardware.
    pub fn set_raw(&mut self, bit: u16, value: bool) {
        if value {
            self.bits |= 1 << bit;
        } else {
            self.bits &= !(1 << bit);
        }
    }

    /// Read a role's logical state (`true` == engaged), or `None` if unbound.
    pub fn read(&self, role: &IoRole) -> Option<bool> {
        let binding = self.bindings.get(role)?;
        let raw = (self.bits >> binding.bit) & 1 != 0;
        Some(match binding.logic {
            DiLogic::NO => raw,
            DiLogic::NC => !raw,
        })
    }

    /// Convenience: directly set a role's logical state, independent of
    /// bit layout. Used heavily by the simulated driver and tests.
    pub fn set(&mut self, role: IoRole, engaged: bool) {
        let bit = self
            .bindings
            .get(&role)
            .map(|b| b.bit)
            .unwrap_or_else(|| self.bindings.len() as u16);
        let logic = self.bindings.get(&role).map(|b| b.logic).unwrap_or_default();
        self.bindings.entry(role).or_insert(Binding { bit, logic });
        let raw = match logic {
            DiLogic::NO => engaged,
            DiLogic::NC => !engaged,
        };
        self.set_raw(bit, raw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_unbound_role_is_none() {
        let bank = SwitchBank::new();
        assert_eq!(bank.read(&IoRole::EStop), None);
    }

    #[test]
    fn no_logic_roundtrip() {
        let mut bank = SwitchBank::new();
        bank.bind(IoRole::LimitMin(0), 3, DiLogic::NO);
        bank.set_raw(3, true);
        assert_eq!(bank.read(&IoRole::LimitMin(0)), Some(true));
        bank.set_raw(3, false);
        assert_eq!(bank.read(&IoRole::LimitMin(0)), Some(false));
    }

    #[test]
    fn nc_logic_inverts() {
        let mut bank = SwitchBank::new();
        bank.bind(IoRole::EStop, 0, DiLogic::NC);
        bank.set_raw(0, false);
        assert_eq!(bank.read(&IoRole::EStop), Some(true));
        bank.set_raw(0, true);
        assert_eq!(bank.read(&IoRole::EStop), Some(false));
    }

    #[test]
    fn set_convenience_binds_on_first_use() {
        let mut bank = SwitchBank::new();
        bank.set(IoRole::Probe, true);
        assert_eq!(bank.read(&IoRole::Probe), Some(true));
        bank.set(IoRole::Probe, false);
        assert_eq!(bank.read(&IoRole::Probe), Some(false));
    }
}
