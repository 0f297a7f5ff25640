use bitbox_hww::{
    proto::{
        btc::{BtcCoin, MultisigScriptType, ScriptConfig, XPubType, HARDENED},
        Request, Version,
    },
    Error, Feature, MAX_NAME_LEN,
};
use bitbox_hww_sim::{Confirm, ConfirmKind, Engine, TestDriver, SIM_VERSION};

mod helpers;
use helpers::*;

const MULTISIG_KEYPATH: [u32; 4] = [48 + HARDENED, HARDENED, HARDENED, 2 + HARDENED];

fn multisig() -> ScriptConfig {
    ScriptConfig::Multisig {
        threshold: 2,
        xpubs: vec![
            "xpub6EMfjyGVUvwhpc3WKN1zXhMFGKJGMaSBPqbja4tbGoYvRBSXeTBCaqrRDjcuGTcaY95JrrAnQvDG3pdQPdtnYUCugjeksHSbyZT7rq38VQF".to_string(),
            "xpub6ERxBysTYfQyV5NYAV6WZVj1dfTzATBvkH6Lss9P6wjSVfCnSwUydxgnKwc3x2KzR8Zbr1KZSDrBTcpFCsVnm2ZJnvbRS3MZCk5RRQRJYVD".to_string(),
            "xpub6EpAuuhPtBNtGCoM9M3vDAsuNzSCcwDdiEeSxEfGKJAXBNZaYsFtabChqpT6DxmLnXJzAr8pD5nh6svkUNr3c2xkwBUFJyDh28NGKn6E8dF".to_string(),
        ],
        our_xpub_index: 1,
        script_type: MultisigScriptType::P2wsh,
    }
}

#[tokio::test]
async fn register_script_config() -> anyhow::Result<()> {
    let (t, d) = sim(SIM_VERSION, Engine::new(TestDriver::default()));

    assert!(
        !d.is_script_config_registered(BtcCoin::Btc, multisig(), &MULTISIG_KEYPATH)
            .await?
    );

    d.register_script_config(
        BtcCoin::Btc,
        multisig(),
        &MULTISIG_KEYPATH,
        "cold storage",
        XPubType::AutoXpubTpub,
    )
    .await?;

    assert!(
        d.is_script_config_registered(BtcCoin::Btc, multisig(), &MULTISIG_KEYPATH)
            .await?
    );

    // Names must be unique
    let r = d
        .register_script_config(
            BtcCoin::Btc,
            multisig(),
            &MULTISIG_KEYPATH,
            "cold storage",
            XPubType::AutoElectrum,
        )
        .await;
    assert!(matches!(r, Err(Error::DuplicateRegistration)), "unexpected result: {r:?}");

    // Over-long names are rejected before sending
    let n = t.requests().await.len();
    let r = d
        .register_script_config(
            BtcCoin::Btc,
            multisig(),
            &MULTISIG_KEYPATH,
            &"a".repeat(MAX_NAME_LEN + 1),
            XPubType::AutoElectrum,
        )
        .await;
    assert!(matches!(r, Err(Error::InvalidArgument(_))));
    assert_eq!(t.requests().await.len(), n);

    Ok(())
}

#[tokio::test]
async fn register_with_device_name() -> anyhow::Result<()> {
    let drv = TestDriver::default().with_name("entered on device");
    let (t, d) = sim(SIM_VERSION, Engine::new(drv));

    d.register_script_config(
        BtcCoin::Btc,
        multisig(),
        &MULTISIG_KEYPATH,
        "",
        XPubType::AutoElectrum,
    )
    .await?;

    let e = t.engine().await;
    assert!(e.driver().confirmations().contains(&Confirm::Register {
        coin: BtcCoin::Btc,
        name: "entered on device".to_string(),
    }));

    Ok(())
}

#[tokio::test]
async fn register_name_prompt_unsupported() -> anyhow::Result<()> {
    let (t, d) = sim(Version::new(9, 2, 0), Engine::new(TestDriver::default()));

    let r = d
        .register_script_config(
            BtcCoin::Btc,
            multisig(),
            &MULTISIG_KEYPATH,
            "",
            XPubType::AutoElectrum,
        )
        .await;
    assert!(
        matches!(
            r,
            Err(Error::Unsupported {
                feature: Feature::RegisterNamePrompt,
                ..
            })
        ),
        "unexpected result: {r:?}"
    );
    assert!(t.requests().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn register_declined() -> anyhow::Result<()> {
    let drv = TestDriver::default().decline(ConfirmKind::Register);
    let (_t, d) = sim(SIM_VERSION, Engine::new(drv));

    let r = d
        .register_script_config(
            BtcCoin::Btc,
            multisig(),
            &MULTISIG_KEYPATH,
            "vault",
            XPubType::AutoElectrum,
        )
        .await;
    assert!(matches!(r, Err(Error::UserAbort)), "unexpected result: {r:?}");

    Ok(())
}

#[tokio::test]
async fn set_password() -> anyhow::Result<()> {
    let (t, d) = sim(SIM_VERSION, Engine::new(TestDriver::default()).uninitialised());

    assert!(d.set_password(32).await?);
    assert!(t.engine().await.is_seeded());

    // Host entropy delivered to the device
    let entropy = t.requests().await.iter().find_map(|r| match r {
        Request::SetPassword { entropy } => Some(entropy.len()),
        _ => None,
    });
    assert_eq!(entropy, Some(32));

    Ok(())
}

#[tokio::test]
async fn set_password_declined() -> anyhow::Result<()> {
    let drv = TestDriver::default().decline(ConfirmKind::SetPassword);
    let (t, d) = sim(SIM_VERSION, Engine::new(drv).uninitialised());

    assert!(!d.set_password(16).await?);
    assert!(!t.engine().await.is_seeded());

    Ok(())
}

#[tokio::test]
async fn set_password_entropy_sizes() -> anyhow::Result<()> {
    let (_t, d) = sim(Version::new(9, 5, 0), Engine::new(TestDriver::default()).uninitialised());

    let r = d.set_password(16).await;
    assert!(
        matches!(
            r,
            Err(Error::Unsupported {
                feature: Feature::ReducedEntropy,
                ..
            })
        ),
        "unexpected result: {r:?}"
    );

    let r = d.set_password(24).await;
    assert!(matches!(r, Err(Error::InvalidArgument(_))));

    Ok(())
}

#[tokio::test]
async fn backups() -> anyhow::Result<()> {
    let (_t, d) = sim(SIM_VERSION, Engine::new(TestDriver::default()).uninitialised());

    // Nothing to back up yet
    assert!(!d.create_backup().await?);
    assert_eq!(d.check_backup(true).await?, None);

    assert!(d.set_password(32).await?);
    assert_eq!(d.check_backup(true).await?, None);

    assert!(d.create_backup().await?);
    let id = d.check_backup(false).await?.expect("missing backup");

    assert!(d.restore_backup(&id).await?);
    assert!(!d.restore_backup("0000000000000000").await?);

    Ok(())
}

#[tokio::test]
async fn backup_time_and_offset() -> anyhow::Result<()> {
    let (t, d) = sim(SIM_VERSION, Engine::new(TestDriver::default()).uninitialised());

    assert!(d.set_password(32).await?);
    assert!(d.create_backup().await?);
    let id = d.check_backup(true).await?.expect("missing backup");
    assert!(d.restore_backup(&id).await?);

    let now = chrono::Local::now();
    let offset = now.offset().local_minus_utc();

    // Both backup requests carry the local time and UTC offset
    let stamps: Vec<_> = t
        .requests()
        .await
        .iter()
        .filter_map(|r| match r {
            Request::CreateBackup {
                timestamp,
                timezone_offset,
            }
            | Request::RestoreBackup {
                timestamp,
                timezone_offset,
                ..
            } => Some((*timestamp, *timezone_offset)),
            _ => None,
        })
        .collect();
    assert_eq!(stamps.len(), 2);

    for (timestamp, timezone_offset) in stamps {
        assert_eq!(timezone_offset, offset);
        assert!((now.timestamp() - timestamp as i64).abs() < 60);
    }

    Ok(())
}
