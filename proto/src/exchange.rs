// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transport facade consumed by the host library
//!
//! Framing, pairing and channel encryption live behind this trait, a
//! transport only has to deliver one [Request] and return the matching
//! [Response].

use crate::{Request, Response, Version};

/// Request / response exchange with a paired signer
#[async_trait::async_trait]
pub trait Exchange {
    /// Channel error type
    type Error: std::error::Error + Send + Sync + 'static;

    /// Send a request and await the signer's response
    async fn exchange(&self, req: &Request) -> Result<Response, Self::Error>;

    /// Firmware version negotiated during pairing
    fn version(&self) -> Version;
}

/// Blanket [Exchange] impl for references
#[async_trait::async_trait]
impl<T: Exchange + Send + Sync> Exchange for &T {
    type Error = <T as Exchange>::Error;

    async fn exchange(&self, req: &Request) -> Result<Response, Self::Error> {
        <T as Exchange>::exchange(self, req).await
    }

    fn version(&self) -> Version {
        <T as Exchange>::version(self)
    }
}
