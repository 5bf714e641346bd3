mod common;

use chrono::{TimeZone, Utc};
use common::{example_sale, example_ts, REGISTERED_SCHEMA};
use sale_codec::record::{InMemorySchemaStore, SaleField};
use sale_codec::{Error, Sale, SaleCodec, Schema};

#[test]
fn test_registered_schema_has_local_fingerprint() {
    let registered = Schema::parse_str(REGISTERED_SCHEMA).unwrap();
    let codec = SaleCodec::new();

    assert_eq!(registered.fingerprint(), codec.fingerprint());
    assert_eq!(registered, *codec.schema());
}

#[test]
fn test_local_schema_document_parses_back() {
    let codec = SaleCodec::new();
    let document = codec.schema().to_json().to_string();
    assert_eq!(Schema::parse_str(&document).unwrap().fingerprint(), codec.fingerprint());
}

#[test]
fn test_example_sale_round_trip() {
    let codec = SaleCodec::new();
    let sale = example_sale();

    assert_ne!(sale.ts(), example_ts());
    assert_eq!(sale.ts(), Utc.timestamp_millis_opt(1_704_067_200_123).unwrap());

    let decoded = codec.decode(&codec.encode(&sale)).unwrap();
    assert_eq!(decoded, sale);
}

#[test]
fn test_decode_with_store_for_registered_schema() {
    let mut store = InMemorySchemaStore::new();
    store.add_schema(Schema::parse_str(REGISTERED_SCHEMA).unwrap());
    assert_eq!(store.len(), 1);

    let codec = SaleCodec::new();
    let bytes = codec.encode(&example_sale());
    assert_eq!(codec.decode_with(&bytes, &store).unwrap(), example_sale());
}

#[test]
fn test_error_kinds_are_distinguishable() {
    let codec = SaleCodec::new();
    let bytes = codec.encode(&example_sale()).to_vec();

    let mut unknown = bytes.clone();
    unknown[9] ^= 0x01;
    let err = codec.decode(&unknown).unwrap_err();
    assert!(err.is_schema_not_found());

    let err = codec.decode(&bytes[..bytes.len() - 3]).unwrap_err();
    assert!(matches!(err, Error::MalformedPayload { .. }));
    assert!(!err.is_schema_not_found());
}

#[test]
fn test_builder_copy_isolation() {
    let b1 = Sale::builder().confirmation_code("FIRST");
    let b2 = b1.clone().confirmation_code("SECOND");

    let complete = |b: sale_codec::SaleBuilder| {
        b.order_id(1)
            .product_id(1)
            .customer_id(1)
            .cc_number("4111")
            .expiration("01/30")
            .amount(1.0)
            .ts(Utc::now())
            .build()
            .unwrap()
    };

    assert_eq!(complete(b1).confirmation_code(), "FIRST");
    assert_eq!(complete(b2).confirmation_code(), "SECOND");
}

#[test]
fn test_builder_from_existing_record() {
    let sale = example_sale();
    let mut builder = sale.to_builder();
    builder.clear(SaleField::CcNumber);

    match builder.build() {
        Err(Error::MissingRequiredField { field }) => assert_eq!(field, "cc_number"),
        other => panic!("expected missing field, got {:?}", other),
    }

    // The source record is untouched
    assert_eq!(sale.cc_number(), "4111111111111111");
}
