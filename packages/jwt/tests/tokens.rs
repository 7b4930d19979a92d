//! End-to-end tests for token generation, parsing, and verification

use std::sync::Arc;

use serde_json::{json, Value};
use tales_jwt::codec::{base64url_decode, base64url_encode};
use tales_jwt::{
    ClaimCodecRegistry, ClaimMap, ClaimValue, FixedClock, GenerationConfiguration, SigningAlgorithm,
    TokenError, TokenManager,
};

const NOW: i64 = 1_000_000;
// 32 bytes, long enough for HS256 on the strict path
const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";
const WRONG_SECRET: &[u8] = b"ffffffffffffffffffffffffffffffff";
// short secrets exercise the key-length opt-out
const SHORT_SECRET: &[u8] = b"secret";
const EMPTY_SECRET: &[u8] = b"";

fn manager(configuration: GenerationConfiguration) -> TokenManager {
    TokenManager::with_clock(
        configuration,
        ClaimCodecRegistry::new(),
        Arc::new(FixedClock::at(NOW)),
    )
}

fn decode_json_segment(segment: &str) -> Value {
    let bytes = base64url_decode(segment).expect("segment decodes");
    serde_json::from_slice(&bytes).expect("segment is json")
}

#[test]
fn hs256_sign_and_verify_round_trip() {
    // short shared secrets still appear in the wild, so this path opts out
    // of the key length floor
    let manager = manager(GenerationConfiguration::default()).allow_short_keys();

    let mut claims = ClaimMap::new();
    claims.insert("sub", "joe");
    claims.insert("admin", true);

    let token = manager.generate(&claims, Some(SHORT_SECRET)).unwrap();
    assert!(token.verified());

    let parsed = manager.parse(token.serialized(), Some(SHORT_SECRET)).unwrap();
    assert!(parsed.verified());
    assert_eq!(parsed.claim_str("sub"), Some("joe"));
    assert_eq!(parsed.claim_bool("admin"), Some(true));
    assert_eq!(parsed.header("alg").and_then(ClaimValue::as_str), Some("HS256"));
}

#[test]
fn configured_claims_are_stamped_and_round_trip() {
    let configuration = GenerationConfiguration::default()
        .with_issuer("https://issuer.example.com")
        .with_generated_id()
        .with_issued_time()
        .with_valid_delay(5)
        .with_valid_duration(60);
    let manager = manager(configuration);

    let mut claims = ClaimMap::new();
    claims.insert("sub", "joe");

    let token = manager.generate(&claims, Some(SECRET)).unwrap();
    assert_eq!(token.claim_str("iss"), Some("https://issuer.example.com"));
    assert_eq!(token.issued_at(), Some(NOW));
    assert_eq!(token.not_before(), Some(NOW + 5));
    assert_eq!(token.expiration(), Some(NOW + 5 + 60));
    let id = token.claim_str("jti").expect("jti was generated");
    assert!(!id.is_empty());

    let parsed = manager.parse(token.serialized(), Some(SECRET)).unwrap();
    assert!(parsed.verified());
    assert_eq!(parsed.claims(), token.claims());
    assert_eq!(parsed.headers(), token.headers());
}

#[test]
fn configured_claims_override_caller_values() {
    let configuration = GenerationConfiguration::default().with_issuer("https://real.example.com");
    let manager = manager(configuration);

    let mut claims = ClaimMap::new();
    claims.insert("iss", "https://fake.example.com");

    let token = manager.generate(&claims, Some(SECRET)).unwrap();
    assert_eq!(token.claim_str("iss"), Some("https://real.example.com"));
}

#[test]
fn generation_is_deterministic_under_a_fixed_clock() {
    // no generated id: jti is the one configured claim that cannot repeat
    let configuration = GenerationConfiguration::default()
        .with_issuer("https://issuer.example.com")
        .with_issued_time()
        .with_valid_duration(300);

    let mut claims = ClaimMap::new();
    claims.insert("sub", "joe");
    claims.insert("level", 7_i64);

    let first = manager(configuration.clone())
        .generate(&claims, Some(SECRET))
        .unwrap();
    let second = manager(configuration)
        .generate(&claims, Some(SECRET))
        .unwrap();
    assert_eq!(first.serialized(), second.serialized());
}

#[test]
fn serialized_tokens_are_never_padded() {
    let manager = manager(GenerationConfiguration::default());
    let mut claims = ClaimMap::new();
    // lengths chosen to force padding in standard base64
    claims.insert("sub", "j");
    claims.insert("x", "yz");

    let token = manager.generate(&claims, Some(SECRET)).unwrap();
    assert!(!token.serialized().contains('='));
}

#[test]
fn tampered_claims_fail_verification_without_raising() {
    let manager = manager(GenerationConfiguration::default());
    let mut claims = ClaimMap::new();
    claims.insert("sub", "joe");

    let token = manager.generate(&claims, Some(SECRET)).unwrap();
    let segments: Vec<&str> = token.serialized().split('.').collect();

    // swap the subject for one of the same length so the json stays valid
    let claims_json = String::from_utf8(base64url_decode(segments[1]).unwrap()).unwrap();
    let tampered_json = claims_json.replace("joe", "moe");
    assert_ne!(claims_json, tampered_json);
    let tampered = format!(
        "{}.{}.{}",
        segments[0],
        base64url_encode(tampered_json.as_bytes()),
        segments[2]
    );

    let parsed = manager.parse(&tampered, Some(SECRET)).unwrap();
    assert!(!parsed.verified());
    assert_eq!(parsed.claim_str("sub"), Some("moe"));
}

#[test]
fn wrong_secret_fails_verification_without_raising() {
    let manager = manager(GenerationConfiguration::default());
    let mut claims = ClaimMap::new();
    claims.insert("sub", "joe");

    let token = manager.generate(&claims, Some(SECRET)).unwrap();
    let parsed = manager.parse(token.serialized(), Some(WRONG_SECRET)).unwrap();
    assert!(!parsed.verified());
}

#[test]
fn algorithm_substitution_to_none_is_refused() {
    let manager = manager(GenerationConfiguration::default());
    let mut claims = ClaimMap::new();
    claims.insert("sub", "joe");

    let token = manager.generate(&claims, Some(SECRET)).unwrap();
    let segments: Vec<&str> = token.serialized().split('.').collect();
    let none_header = base64url_encode(br#"{"alg":"none"}"#);

    // stripped signature, two segments
    let stripped = format!("{}.{}", none_header, segments[1]);
    let parsed = manager.parse(&stripped, Some(SECRET)).unwrap();
    assert!(!parsed.verified());

    // trailing dot form
    let with_dot = format!("{}.{}.", none_header, segments[1]);
    let parsed = manager.parse(&with_dot, Some(SECRET)).unwrap();
    assert!(!parsed.verified());

    // original signature left attached
    let with_signature = format!("{}.{}.{}", none_header, segments[1], segments[2]);
    let parsed = manager.parse(&with_signature, None).unwrap();
    assert!(!parsed.verified());
}

#[test]
fn unsigned_tokens_round_trip_when_nothing_expects_a_signature() {
    let manager = manager(GenerationConfiguration::default().unsigned());
    let mut claims = ClaimMap::new();
    claims.insert("sub", "joe");

    let token = manager.generate(&claims, None).unwrap();
    assert!(token.serialized().ends_with('.'));
    assert_eq!(token.header("alg").and_then(ClaimValue::as_str), Some("none"));

    let parsed = manager.parse(token.serialized(), None).unwrap();
    assert!(parsed.verified());
    assert_eq!(parsed.claim_str("sub"), Some("joe"));
}

#[test]
fn signing_without_a_secret_is_a_configuration_error() {
    let manager = manager(GenerationConfiguration::default());
    let claims = ClaimMap::new();

    assert!(matches!(
        manager.generate(&claims, None),
        Err(TokenError::Configuration(_))
    ));
    assert!(matches!(
        manager.generate(&claims, Some(EMPTY_SECRET)),
        Err(TokenError::Configuration(_))
    ));
}

#[test]
fn parsing_a_signed_token_without_a_secret_is_a_configuration_error() {
    let manager = manager(GenerationConfiguration::default());
    let mut claims = ClaimMap::new();
    claims.insert("sub", "joe");
    let token = manager.generate(&claims, Some(SECRET)).unwrap();

    assert!(matches!(
        manager.parse(token.serialized(), None),
        Err(TokenError::Configuration(_))
    ));
}

#[test]
fn short_keys_are_rejected_by_default() {
    let strict = manager(GenerationConfiguration::default());
    let claims = ClaimMap::new();

    let result = strict.generate(&claims, Some(SHORT_SECRET));
    assert!(matches!(result, Err(TokenError::Configuration(_))));

    let relaxed = manager(GenerationConfiguration::default()).allow_short_keys();
    assert!(relaxed.generate(&claims, Some(SHORT_SECRET)).is_ok());
}

#[test]
fn hs384_and_hs512_need_longer_keys() {
    for (algorithm, length) in [
        (SigningAlgorithm::Hs384, 48),
        (SigningAlgorithm::Hs512, 64),
    ] {
        let configuration = GenerationConfiguration::default().with_signing_algorithm(algorithm);
        let strict = manager(configuration.clone());
        let claims = ClaimMap::new();

        let short = vec![0x61_u8; length - 1];
        assert!(matches!(
            strict.generate(&claims, Some(short.as_slice())),
            Err(TokenError::Configuration(_))
        ));

        let exact = vec![0x61_u8; length];
        let token = strict.generate(&claims, Some(exact.as_slice())).unwrap();
        let parsed = strict
            .parse(token.serialized(), Some(exact.as_slice()))
            .unwrap();
        assert!(parsed.verified());
    }
}

#[test]
fn uri_rule_applies_to_colon_bearing_strings() {
    let manager = manager(GenerationConfiguration::default());

    // a colon without a URI around it is rejected, wherever the claim came from
    let mut claims = ClaimMap::new();
    claims.insert("iss", "foo:bar");
    assert!(matches!(
        manager.generate(&claims, Some(SECRET)),
        Err(TokenError::InvalidClaimValue { claim, .. }) if claim == "iss"
    ));

    let mut claims = ClaimMap::new();
    claims.insert("nickname", "a:b");
    assert!(matches!(
        manager.generate(&claims, Some(SECRET)),
        Err(TokenError::InvalidClaimValue { claim, .. }) if claim == "nickname"
    ));

    // absolute URIs and colon-free strings pass
    let mut claims = ClaimMap::new();
    claims.insert("iss", "https://example.com");
    claims.insert("nickname", "plain value");
    assert!(manager.generate(&claims, Some(SECRET)).is_ok());
}

#[test]
fn null_claim_values_are_rejected_at_encoding() {
    let manager = manager(GenerationConfiguration::default());
    let mut claims = ClaimMap::new();
    claims.insert("ghost", ClaimValue::Json(Value::Null));

    assert!(matches!(
        manager.generate(&claims, Some(SECRET)),
        Err(TokenError::InvalidClaimValue { claim, .. }) if claim == "ghost"
    ));
}

#[test]
fn uncodecd_compound_values_are_rejected_at_encoding() {
    let manager = manager(GenerationConfiguration::default());
    let mut claims = ClaimMap::new();
    claims.insert("blob", ClaimValue::Json(json!({"nested": true})));

    assert!(matches!(
        manager.generate(&claims, Some(SECRET)),
        Err(TokenError::InvalidClaimValue { claim, .. }) if claim == "blob"
    ));
}

#[test]
fn audience_writes_the_array_form() {
    let manager = manager(GenerationConfiguration::default());

    let mut claims = ClaimMap::new();
    claims.insert("aud", vec!["a".to_string(), "b".to_string()]);
    let token = manager.generate(&claims, Some(SECRET)).unwrap();
    let segments: Vec<&str> = token.serialized().split('.').collect();
    assert_eq!(decode_json_segment(segments[1]), json!({"aud": ["a", "b"]}));

    // a lone string coerces to a single-element array on write
    let mut claims = ClaimMap::new();
    claims.insert("aud", "a");
    let token = manager.generate(&claims, Some(SECRET)).unwrap();
    let segments: Vec<&str> = token.serialized().split('.').collect();
    assert_eq!(decode_json_segment(segments[1]), json!({"aud": ["a"]}));
}

#[test]
fn audience_reads_the_string_form_as_a_list() {
    let manager = manager(GenerationConfiguration::default());

    let header = base64url_encode(br#"{"alg":"none"}"#);
    let claims = base64url_encode(br#"{"aud":"a"}"#);
    let parsed = manager.parse(&format!("{header}.{claims}"), None).unwrap();

    assert_eq!(
        parsed.claim("aud").and_then(ClaimValue::as_string_list),
        Some(&["a".to_string()][..])
    );
}

#[test]
fn unknown_compound_claims_survive_parsing_opaquely() {
    let manager = manager(GenerationConfiguration::default());

    let header = base64url_encode(br#"{"alg":"none"}"#);
    let claims = base64url_encode(br#"{"extras":{"depth":3},"tags":["x","y"]}"#);
    let parsed = manager.parse(&format!("{header}.{claims}"), None).unwrap();

    assert_eq!(
        parsed.claim("extras"),
        Some(&ClaimValue::Json(json!({"depth": 3})))
    );
    assert_eq!(
        parsed.claim("tags"),
        Some(&ClaimValue::Json(json!(["x", "y"])))
    );
}

#[test]
fn caller_headers_pass_through_unharmed() {
    let manager = manager(GenerationConfiguration::default());

    let mut headers = ClaimMap::new();
    headers.insert("typ", "JWT");
    headers.insert("kid", "key-7");
    headers.insert("x-custom", "kept");
    let mut claims = ClaimMap::new();
    claims.insert("sub", "joe");

    let token = manager
        .generate_with(Some(&headers), &claims, Some(SECRET), None)
        .unwrap();
    let parsed = manager.parse(token.serialized(), Some(SECRET)).unwrap();

    assert_eq!(parsed.header("typ").and_then(ClaimValue::as_str), Some("JWT"));
    assert_eq!(parsed.header("kid").and_then(ClaimValue::as_str), Some("key-7"));
    assert_eq!(
        parsed.header("x-custom").and_then(ClaimValue::as_str),
        Some("kept")
    );
    assert_eq!(parsed.header("alg").and_then(ClaimValue::as_str), Some("HS256"));
}

#[test]
fn caller_maps_are_not_mutated() {
    let manager = manager(GenerationConfiguration::default().with_issuer("https://i.example.com"));
    let claims = ClaimMap::new();

    let _ = manager.generate(&claims, Some(SECRET)).unwrap();
    assert!(claims.is_empty());
}

#[test]
fn float_and_integer_claims_round_trip() {
    let manager = manager(GenerationConfiguration::default());
    let mut claims = ClaimMap::new();
    claims.insert("count", 42_i64);
    claims.insert("ratio", 1.5_f64);

    let token = manager.generate(&claims, Some(SECRET)).unwrap();
    let parsed = manager.parse(token.serialized(), Some(SECRET)).unwrap();

    assert_eq!(parsed.claim_i64("count"), Some(42));
    assert_eq!(parsed.claim("ratio").and_then(ClaimValue::as_f64), Some(1.5));
}

#[test]
fn malformed_tokens_raise_structural_errors() {
    let manager = manager(GenerationConfiguration::default());

    // valid base64url that does not decode to json
    assert!(matches!(
        manager.parse("abc.def", None),
        Err(TokenError::MalformedToken(_))
    ));

    // a single segment
    assert!(matches!(
        manager.parse("lonely", None),
        Err(TokenError::MalformedToken(_))
    ));

    // four segments on an otherwise valid token
    let mut claims = ClaimMap::new();
    claims.insert("sub", "joe");
    let token = manager.generate(&claims, Some(SECRET)).unwrap();
    let four = format!("{}.extra", token.serialized());
    assert!(matches!(
        manager.parse(&four, Some(SECRET)),
        Err(TokenError::MalformedToken(_))
    ));

    // padding is outside the alphabet
    let padded = base64url_encode(br#"{"alg":"none"}"#);
    assert!(matches!(
        manager.parse(&format!("{padded}.e30="), None),
        Err(TokenError::MalformedToken(_))
    ));

    // null claim values have no translation
    let header = base64url_encode(br#"{"alg":"none"}"#);
    let null_claims = base64url_encode(br#"{"gone":null}"#);
    assert!(matches!(
        manager.parse(&format!("{header}.{null_claims}"), None),
        Err(TokenError::MalformedToken(_))
    ));

    // a missing alg header is structural
    let no_alg = base64url_encode(br#"{"typ":"JWT"}"#);
    let body = base64url_encode(br#"{}"#);
    assert!(matches!(
        manager.parse(&format!("{no_alg}.{body}"), None),
        Err(TokenError::MalformedToken(_))
    ));
}

#[test]
fn unregistered_algorithms_are_unsupported() {
    let manager = manager(GenerationConfiguration::default());

    let header = base64url_encode(br#"{"alg":"RS256"}"#);
    let claims = base64url_encode(br#"{}"#);
    assert!(matches!(
        manager.parse(&format!("{header}.{claims}.sig"), Some(SECRET)),
        Err(TokenError::UnsupportedAlgorithm(alg)) if alg == "RS256"
    ));
}

#[test]
fn signed_token_with_two_segments_is_malformed() {
    let manager = manager(GenerationConfiguration::default());

    let header = base64url_encode(br#"{"alg":"HS256"}"#);
    let claims = base64url_encode(br#"{"sub":"joe"}"#);
    assert!(matches!(
        manager.parse(&format!("{header}.{claims}"), Some(SECRET)),
        Err(TokenError::MalformedToken(_))
    ));
}

#[test]
fn wire_json_preserves_insertion_order() {
    let manager = manager(GenerationConfiguration::default());
    let mut claims = ClaimMap::new();
    claims.insert("zulu", 1_i64);
    claims.insert("alpha", 2_i64);

    let token = manager.generate(&claims, Some(SECRET)).unwrap();
    let segments: Vec<&str> = token.serialized().split('.').collect();
    let json = String::from_utf8(base64url_decode(segments[1]).unwrap()).unwrap();
    let zulu = json.find("zulu").unwrap();
    let alpha = json.find("alpha").unwrap();
    assert!(zulu < alpha, "members must render in insertion order: {json}");
}
