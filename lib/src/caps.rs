// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Firmware capability gate
//!
//! Every capability is a minimum firmware version, so support is a pure,
//! monotonic function of the negotiated [Version].

use strum::{Display, EnumIter, EnumString};

use bitbox_hww_proto::Version;

/// Version-gated firmware features
#[derive(Copy, Clone, PartialEq, Eq, Debug, Display, EnumIter, EnumString)]
pub enum Feature {
    /// Bitcoin message signing
    BtcSignMessage,
    /// Empty script config registration names are prompted on the device
    RegisterNamePrompt,
    /// Nonce commitments during bitcoin transaction signing
    AntiKleptoTransaction,
    /// Nonce commitments for all single-shot signatures: bitcoin messages,
    /// ethereum transactions and ethereum messages
    AntiKleptoMessage,
    /// 16-byte seed entropy when setting up a wallet
    ReducedEntropy,
}

impl Feature {
    /// Minimum firmware version providing this feature
    pub const fn min_version(&self) -> Version {
        match self {
            Feature::BtcSignMessage => Version::new(9, 2, 0),
            Feature::RegisterNamePrompt => Version::new(9, 3, 0),
            Feature::AntiKleptoTransaction => Version::new(9, 4, 0),
            Feature::AntiKleptoMessage => Version::new(9, 5, 0),
            Feature::ReducedEntropy => Version::new(9, 6, 0),
        }
    }
}

/// Check whether firmware `version` supports `feature`
pub fn supports(feature: Feature, version: &Version) -> bool {
    *version >= feature.min_version()
}

#[cfg(test)]
mod test {
    use proptest::prelude::*;
    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn thresholds() {
        let v = Version::new(9, 4, 0);

        assert!(supports(Feature::BtcSignMessage, &v));
        assert!(supports(Feature::AntiKleptoTransaction, &v));
        assert!(!supports(Feature::AntiKleptoMessage, &v));
        assert!(!supports(Feature::ReducedEntropy, &v));

        assert!(!supports(Feature::AntiKleptoTransaction, &Version::new(9, 3, 99)));
        assert!(supports(Feature::ReducedEntropy, &Version::new(10, 0, 0)));
    }

    fn version() -> impl Strategy<Value = Version> {
        (0u32..12, 0u32..12, 0u32..4).prop_map(|(a, b, c)| Version::new(a, b, c))
    }

    proptest! {
        #[test]
        fn support_is_monotonic(a in version(), b in version()) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };

            for f in Feature::iter() {
                prop_assert!(!supports(f, &lo) || supports(f, &hi), "{} at {} but not {}", f, lo, hi);
            }
        }
    }
}
