//! Constant-pool references to the dispatcher entry points.

use crate::assembly::opcodes;

/// Name and descriptor of every dispatcher entry point called from rewritten code.
///
/// The class-writing layer adds a `Methodref` for each of these to the constant pool of a
/// class before handing its methods to the rewriter.
pub const DISPATCHER_METHODS: [(&str, &str); 7] = [
    ("lcmp", "(JJ)I"),
    ("fcmpl", "(FF)I"),
    ("fcmpg", "(FF)I"),
    ("dcmpl", "(DD)I"),
    ("dcmpg", "(DD)I"),
    ("icmp_jump", "(III)Z"),
    ("acmp_jump", "(Ljava/lang/Object;Ljava/lang/Object;I)Z"),
];

/// Internal name of the class owning the dispatcher entry points.
pub const DEFAULT_DISPATCHER_OWNER: &str = "pathcond/runtime/Dispatch";

/// Constant-pool indices of the dispatcher `Methodref`s in the class being rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatcherRefs {
    /// Internal name of the owning class
    pub owner: String,
    /// `lcmp (JJ)I`
    pub lcmp: u16,
    /// `fcmpl (FF)I`
    pub fcmpl: u16,
    /// `fcmpg (FF)I`
    pub fcmpg: u16,
    /// `dcmpl (DD)I`
    pub dcmpl: u16,
    /// `dcmpg (DD)I`
    pub dcmpg: u16,
    /// `icmp_jump (III)Z`
    pub icmp_jump: u16,
    /// `acmp_jump (Ljava/lang/Object;Ljava/lang/Object;I)Z`
    pub acmp_jump: u16,
}

impl DispatcherRefs {
    /// Build refs from indices listed in [`DISPATCHER_METHODS`] order.
    #[must_use]
    pub fn from_indices(owner: impl Into<String>, indices: [u16; 7]) -> Self {
        let [lcmp, fcmpl, fcmpg, dcmpl, dcmpg, icmp_jump, acmp_jump] = indices;
        Self {
            owner: owner.into(),
            lcmp,
            fcmpl,
            fcmpg,
            dcmpl,
            dcmpg,
            icmp_jump,
            acmp_jump,
        }
    }

    /// The entry point replacing an ordered-compare opcode.
    #[must_use]
    pub fn ordered_compare(&self, opcode: u8) -> Option<u16> {
        match opcode {
            opcodes::LCMP => Some(self.lcmp),
            opcodes::FCMPL => Some(self.fcmpl),
            opcodes::FCMPG => Some(self.fcmpg),
            opcodes::DCMPL => Some(self.dcmpl),
            opcodes::DCMPG => Some(self.dcmpg),
            _ => None,
        }
    }

    /// Package prefix of the owning class, including the trailing `/`.
    #[must_use]
    pub fn owner_package(&self) -> &str {
        match self.owner.rfind('/') {
            Some(slash) => &self.owner[..=slash],
            None => "",
        }
    }

    /// All indices in [`DISPATCHER_METHODS`] order.
    #[must_use]
    pub fn indices(&self) -> [u16; 7] {
        [
            self.lcmp,
            self.fcmpl,
            self.fcmpg,
            self.dcmpl,
            self.dcmpg,
            self.icmp_jump,
            self.acmp_jump,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_round_trip() {
        let refs = DispatcherRefs::from_indices(DEFAULT_DISPATCHER_OWNER, [1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(refs.indices(), [1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(refs.ordered_compare(opcodes::DCMPG), Some(5));
        assert_eq!(refs.ordered_compare(opcodes::IADD), None);
        assert_eq!(refs.owner_package(), "pathcond/runtime/");
    }
}
