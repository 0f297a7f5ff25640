// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Signing session step types
//!

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, EnumVariantNames};

/// Piece of the transaction requested next by the signer,
/// carried in [`SignNextResponse`](crate::btc::SignNextResponse)
#[derive(
    Copy,
    Clone,
    PartialEq,
    Eq,
    Debug,
    EnumString,
    Display,
    EnumVariantNames,
    EnumIter,
    TryFromPrimitive,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
pub enum NextType {
    Input = 0x00,
    Output = 0x01,
    Done = 0x02,
    PrevtxInit = 0x03,
    PrevtxInput = 0x04,
    PrevtxOutput = 0x05,
    HostNonce = 0x06,
}
