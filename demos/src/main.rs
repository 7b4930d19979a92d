//! Walkthrough: issue a capability-bearing token, then authorize with it

use std::sync::Arc;

use tales_accesscontrol::{AccessControlManager, CapabilityFamily, CapabilityRequirement};
use tales_jwt::{
    ClaimCodecRegistry, ClaimMap, ClaimValue, GenerationConfiguration, TokenManager,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let secret: &[u8] = b"an-ops-team-secret-of-32-bytes!!";

    // one family of document capabilities, bound to the doc_caps claim
    let family = CapabilityFamily::builder("documents")
        .capability("read")
        .capability("write")
        .capability("admin")
        .build()?;

    let mut registry = ClaimCodecRegistry::new();
    let mut access = AccessControlManager::new();
    access.register_capability_claim("doc_caps", &family, &mut registry)?;
    access.register_operation(
        "documents.update",
        &[CapabilityRequirement::new("doc_caps", ["write"])],
    )?;
    access.register_operation(
        "documents.purge",
        &[CapabilityRequirement::new("doc_caps", ["admin"])],
    )?;

    let configuration = GenerationConfiguration::default()
        .with_issuer("https://auth.example.com")
        .with_generated_id()
        .with_issued_time()
        .with_valid_duration(3600);
    let tokens = TokenManager::new(configuration, registry);

    // issue a token for an editor who can read and write but not purge
    let mut claims = ClaimMap::new();
    claims.insert("sub", "editors/joe");
    claims.insert(
        "doc_caps",
        ClaimValue::Custom(Arc::new(family.set_of(["read", "write"])?)),
    );
    let issued = tokens.generate(&claims, Some(secret))?;
    println!("issued token:\n  {issued}");

    // what an inbound request would do: parse, then authorize
    let inbound = tokens.parse(issued.serialized(), Some(secret))?;
    println!("signature verified: {}", inbound.verified());

    for operation in ["documents.update", "documents.purge"] {
        let decision = access.authorize(&inbound, operation)?;
        println!("{operation}: {decision:?}");
    }

    Ok(())
}
