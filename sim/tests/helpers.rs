#![allow(unused)]

use log::LevelFilter;
use simplelog::{ConfigBuilder, SimpleLogger};

use bitbox_hww_proto::{
    btc::{
        BtcCoin, ScriptConfig, ScriptConfigWithKeypath, SignInitRequest, SignInputRequest,
        SignNextResponse, SignOutputRequest, OutputType, SimpleType, HARDENED,
    },
    Request, Response,
};

pub const ACCOUNT: [u32; 3] = [84 + HARDENED, HARDENED, HARDENED];

pub fn setup() {
    let log_cfg = ConfigBuilder::new()
        .add_filter_ignore_str("mio")
        .build();
    let _ = SimpleLogger::init(LevelFilter::Debug, log_cfg);
}

/// Unwrap a signing session response
pub fn next(r: Response) -> SignNextResponse {
    match r {
        Response::BtcSignNext(n) => n,
        r => panic!("unexpected response: {r:?}"),
    }
}

pub fn sign_init(simple: SimpleType, num_inputs: u32, num_outputs: u32) -> SignInitRequest {
    SignInitRequest {
        coin: BtcCoin::Btc,
        script_configs: vec![ScriptConfigWithKeypath {
            script_config: ScriptConfig::Simple(simple),
            keypath: ACCOUNT.to_vec(),
        }],
        version: 2,
        num_inputs,
        num_outputs,
        locktime: 0,
    }
}

pub fn sign_input(i: u32, value: u64) -> SignInputRequest {
    SignInputRequest {
        prev_out_hash: vec![0xa0 + i as u8; 32],
        prev_out_index: 1,
        prev_out_value: value,
        sequence: 0xffff_ffff,
        keypath: [&ACCOUNT[..], &[0, i]].concat(),
        script_config_index: 0,
        host_nonce_commitment: None,
    }
}

pub fn sign_output(value: u64) -> SignOutputRequest {
    SignOutputRequest {
        ours: false,
        output_type: Some(OutputType::P2wpkh),
        value,
        hash: vec![0x42; 20],
        keypath: vec![],
        script_config_index: 0,
    }
}
