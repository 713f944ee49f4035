//! CLI: issue a self-signed certificate with a PKCS#11 token's RSA key.

use std::env;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use clap::{Arg, Command};

use pkcs11_selfsign::{
    CertificateBuilder, CertificateProfile, HashAlgorithm, SigningEngine, TokenSession,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = Command::new("pkcs11-selfsign")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Issue a self-signed X.509 certificate using a PKCS#11 token")
        .arg(
            Arg::new("module")
                .short('m')
                .long("module")
                .value_name("PATH")
                .help("Path to the PKCS#11 module library")
                .required(true),
        )
        .arg(
            Arg::new("subject")
                .value_name("SUBJECT")
                .help("RFC 4514 subject name, e.g. \"CN=Test,O=Example,C=AT\"")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .value_name("FILE")
                .help("Output path for the DER-encoded certificate")
                .required(true),
        )
        .arg(
            Arg::new("slot")
                .short('s')
                .long("slot")
                .value_name("INDEX")
                .help("Index into the list of slots with a token present")
                .default_value("0"),
        )
        .arg(
            Arg::new("pin")
                .short('p')
                .long("pin")
                .value_name("PIN")
                .help("User PIN (can also use PKCS11_PIN env var)"),
        )
        .arg(
            Arg::new("key-label")
                .short('l')
                .long("key-label")
                .value_name("LABEL")
                .help("CKA_LABEL of the signing key (first RSA signing key otherwise)"),
        )
        .arg(
            Arg::new("hash")
                .long("hash")
                .value_name("ALGORITHM")
                .help("Digest algorithm: sha1, sha256, sha384, sha512")
                .default_value("sha256"),
        )
        .arg(
            Arg::new("serial")
                .long("serial")
                .value_name("N")
                .help("Certificate serial number (positive)")
                .default_value("1"),
        )
        .arg(
            Arg::new("days")
                .long("days")
                .value_name("N")
                .help("Validity in days, starting now")
                .default_value("1095"),
        )
        .get_matches();

    let module = matches.get_one::<String>("module").unwrap();
    let subject = matches.get_one::<String>("subject").unwrap();
    let output = matches.get_one::<String>("output").unwrap();
    let key_label = matches.get_one::<String>("key-label").map(String::as_str);

    let slot: usize = matches
        .get_one::<String>("slot")
        .unwrap()
        .parse()
        .context("Invalid slot index")?;
    let serial: u64 = matches
        .get_one::<String>("serial")
        .unwrap()
        .parse()
        .context("Invalid serial number")?;
    let days: u64 = matches
        .get_one::<String>("days")
        .unwrap()
        .parse()
        .context("Invalid validity length")?;
    let hash: HashAlgorithm = matches
        .get_one::<String>("hash")
        .unwrap()
        .parse()
        .context("Invalid hash algorithm")?;

    let pin = matches
        .get_one::<String>("pin")
        .cloned()
        .or_else(|| env::var("PKCS11_PIN").ok())
        .context("PIN must be provided via --pin or the PKCS11_PIN environment variable")?;

    let session =
        TokenSession::open(module, slot, &pin).context("Failed to open token session")?;
    let key = session
        .find_signing_key(key_label)
        .context("No usable signing key")?;
    let public_key = session
        .public_key_parts(key)
        .context("Failed to read public key components")?;

    let mut engine = SigningEngine::new(&session, hash)
        .context("Token cannot perform raw RSA signing")?;

    let not_before = SystemTime::now();
    let not_after = not_before + Duration::from_secs(days * 24 * 60 * 60);
    let profile = CertificateProfile::new(subject, serial, not_before, not_after);

    let certificate = CertificateBuilder::build(&profile, &public_key, &mut engine, key)
        .context("Certificate issuance failed")?;

    std::fs::write(output, certificate.as_der())
        .with_context(|| format!("Failed to write certificate to {output}"))?;
    log::info!("wrote {} bytes to {output}", certificate.as_der().len());

    Ok(())
}
