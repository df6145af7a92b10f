//! End-to-end engine tests over a realistic token contract ABI.

use abi_codec::{AbiDef, Contract, Name};

const TOKEN_ABI: &str = r#"{
    "version": "eosio::abi/1.0",
    "types": [{"new_type_name": "account_name", "type": "name"}],
    "structs": [
        {
            "name": "transfer",
            "base": "",
            "fields": [
                {"name": "from", "type": "account_name"},
                {"name": "to", "type": "account_name"},
                {"name": "quantity", "type": "asset"},
                {"name": "memo", "type": "string"}
            ]
        },
        {
            "name": "parent",
            "base": "",
            "fields": [{"name": "p", "type": "uint8"}]
        },
        {
            "name": "child",
            "base": "parent",
            "fields": [{"name": "c", "type": "uint8"}]
        },
        {
            "name": "single",
            "base": "",
            "fields": [{"name": "a", "type": "uint8"}]
        },
        {
            "name": "node",
            "base": "",
            "fields": [{"name": "children", "type": "node[]"}]
        },
        {
            "name": "holdings",
            "base": "",
            "fields": [
                {"name": "owner", "type": "account_name"},
                {"name": "balances", "type": "asset[]"},
                {"name": "note", "type": "string?"}
            ]
        }
    ],
    "actions": [{"name": "transfer", "type": "transfer", "ricardian_contract": ""}]
}"#;

fn token_contract() -> Contract {
    let abi = AbiDef::from_json(TOKEN_ABI).expect("parse token abi");
    Contract::new(&abi).expect("resolve token abi")
}

#[test]
fn transfer_action_round_trips() {
    let contract = token_contract();
    let json = r#"{"from":"alice","to":"bob","quantity":"1.0000 EOS","memo":"test memo"}"#;
    let bin = contract.json_to_bin("transfer", json).expect("encode transfer");

    let mut expected = Vec::new();
    expected.extend_from_slice(&Name::from_str("alice").0.to_le_bytes());
    expected.extend_from_slice(&Name::from_str("bob").0.to_le_bytes());
    expected.extend_from_slice(&10_000i64.to_le_bytes());
    expected.extend_from_slice(&(((0x53_4f45u64) << 8) | 4).to_le_bytes());
    expected.push(9); // memo length
    expected.extend_from_slice(b"test memo");
    assert_eq!(bin, expected);

    let decoded = contract.bin_to_json("transfer", &bin).expect("decode transfer");
    assert_eq!(decoded, json);
}

#[test]
fn action_names_map_to_argument_types() {
    let contract = token_contract();
    assert_eq!(
        contract.action_type(Name::from_str("transfer")),
        Some("transfer")
    );
    assert_eq!(contract.action_type(Name::from_str("issue")), None);
}

#[test]
fn bare_primitives_encode_at_the_root() {
    let contract = token_contract();
    assert_eq!(
        contract.json_to_bin("uint32", "10").expect("uint32"),
        [0x0a, 0x00, 0x00, 0x00]
    );
    assert_eq!(
        contract.json_to_bin("varuint32", "300").expect("varuint32"),
        [0xac, 0x02]
    );
    assert_eq!(
        contract
            .json_to_bin("name", r#""eosio.token""#)
            .expect("name"),
        [0x00, 0xa6, 0x82, 0x34, 0x03, 0xea, 0x30, 0x55]
    );
    assert_eq!(
        contract.bin_to_json("varuint32", &[0xac, 0x02]).expect("decode"),
        "300"
    );
}

#[test]
fn optionals_encode_one_tag_byte() {
    let contract = token_contract();
    assert_eq!(
        contract.json_to_bin("single?", "null").expect("null optional"),
        [0x00]
    );
    assert_eq!(
        contract
            .json_to_bin("single?", r#"{"a":7}"#)
            .expect("present optional"),
        [0x01, 0x07]
    );

    assert_eq!(
        contract.bin_to_json("single?", &[0x00]).expect("decode null"),
        "null"
    );
    assert_eq!(
        contract
            .bin_to_json("single?", &[0x01, 0x07])
            .expect("decode present"),
        r#"{"a":7}"#
    );

    let err = contract.bin_to_json("single?", &[0x02]).unwrap_err();
    assert_eq!(err.to_string(), "invalid optional discriminant: 2");
}

#[test]
fn arrays_carry_their_element_count() {
    let contract = token_contract();
    assert_eq!(
        contract.json_to_bin("uint8[]", "[1,2,3]").expect("encode"),
        [0x03, 0x01, 0x02, 0x03]
    );
    assert_eq!(contract.json_to_bin("uint8[]", "[]").expect("empty"), [0x00]);
    assert_eq!(
        contract
            .json_to_bin("string[]", r#"["ab","c"]"#)
            .expect("strings"),
        [0x02, 0x02, b'a', b'b', 0x01, b'c']
    );
    assert_eq!(
        contract.bin_to_json("uint8[]", &[0x03, 0x01, 0x02, 0x03]).expect("decode"),
        "[1,2,3]"
    );
}

#[test]
fn nested_arrays_backpatch_sizes_in_order() {
    let contract = token_contract();
    let json = r#"{"owner":"alice","balances":["1.0000 EOS","2.5000 SYS"],"note":null}"#;
    let bin = contract.json_to_bin("holdings", json).expect("encode holdings");
    // owner(8) + count(1) + two assets(16 each) + optional tag(1)
    assert_eq!(bin.len(), 8 + 1 + 32 + 1);
    assert_eq!(bin[8], 2);
    assert_eq!(*bin.last().expect("tag"), 0);
    assert_eq!(
        contract.bin_to_json("holdings", &bin).expect("decode"),
        json
    );
}

#[test]
fn inherited_fields_precede_own_fields() {
    let contract = token_contract();
    let bin = contract
        .json_to_bin("child", r#"{"p":1,"c":2}"#)
        .expect("encode child");
    assert_eq!(bin, [0x01, 0x02]);

    // Base fields must come first; reversed key order is rejected.
    let err = contract
        .json_to_bin("child", r#"{"c":2,"p":1}"#)
        .unwrap_err();
    assert_eq!(err.to_string(), "child.p: expected field \"p\"");
}

#[test]
fn struct_fields_are_strictly_ordered() {
    let contract = token_contract();

    let err = contract
        .json_to_bin("transfer", r#"{"from":"alice"}"#)
        .unwrap_err();
    assert_eq!(err.to_string(), "transfer.from: expected field \"to\"");

    let err = contract
        .json_to_bin(
            "transfer",
            r#"{"from":"a","to":"b","quantity":"1.0000 EOS","memo":"","extra":1}"#,
        )
        .unwrap_err();
    assert_eq!(err.to_string(), "transfer: unexpected field \"extra\"");

    let err = contract.json_to_bin("transfer", r#"[1]"#).unwrap_err();
    assert_eq!(err.to_string(), "expected object");
}

#[test]
fn encode_errors_carry_a_breadcrumb_path() {
    let contract = token_contract();
    let err = contract
        .json_to_bin(
            "transfer",
            r#"{"from":[],"to":"b","quantity":"1.0000 EOS","memo":""}"#,
        )
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "transfer.from: expected string containing name"
    );

    let err = contract
        .json_to_bin("transfer[]", r#"[{"from":"a","to":"b","quantity":"1.0000 EOS","memo":""},{"from":{}}]"#)
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "[1].from: expected string containing name"
    );
}

#[test]
fn extended_asset_is_built_in() {
    let contract = token_contract();
    let json = r#"{"quantity":"1.0000 EOS","contract":"eosio.token"}"#;
    let bin = contract
        .json_to_bin("extended_asset", json)
        .expect("encode extended_asset");
    assert_eq!(bin.len(), 24);
    assert_eq!(
        contract.bin_to_json("extended_asset", &bin).expect("decode"),
        json
    );
}

#[test]
fn recursive_types_hit_the_walker_depth_cap() {
    let contract = token_contract();

    // 80 nesting levels of {"children":[...]} is two frames per level.
    let mut json = String::new();
    for _ in 0..80 {
        json.push_str(r#"{"children":["#);
    }
    json.push_str(r#"{"children":[]}"#);
    for _ in 0..80 {
        json.push_str("]}");
    }
    let err = contract.json_to_bin("node", &json).unwrap_err();
    assert!(
        err.to_string().ends_with("recursion limit reached"),
        "got {err}"
    );

    // Matching wire form: 80 one-element arrays, then one empty array.
    let mut bin = vec![0x01u8; 80];
    bin.push(0x00);
    let err = contract.bin_to_json("node", &bin).unwrap_err();
    assert_eq!(err.to_string(), "recursion limit reached");
}

#[test]
fn shallow_recursive_values_still_work() {
    let contract = token_contract();
    let json = r#"{"children":[{"children":[]},{"children":[{"children":[]}]}]}"#;
    let bin = contract.json_to_bin("node", json).expect("encode tree");
    assert_eq!(
        contract.bin_to_json("node", &bin).expect("decode tree"),
        json
    );
}

#[test]
fn truncated_binary_reports_read_past_end() {
    let contract = token_contract();
    let err = contract.bin_to_json("transfer", &[0x01, 0x02]).unwrap_err();
    assert_eq!(err.to_string(), "read past end");

    // A string length running past the payload is caught before the copy.
    let err = contract
        .bin_to_json("string", &[0x05, b'a', b'b'])
        .unwrap_err();
    assert_eq!(err.to_string(), "invalid string size");
}

#[test]
fn trailing_json_input_is_rejected() {
    let contract = token_contract();
    let err = contract.json_to_bin("uint8", "1 2").unwrap_err();
    assert_eq!(err.to_string(), "trailing characters after JSON value");
}

#[test]
fn unknown_root_type_is_reported() {
    let contract = token_contract();
    let err = contract.json_to_bin("mystery", "1").unwrap_err();
    assert_eq!(err.to_string(), "unknown type \"mystery\"");
}

#[test]
fn aliases_are_transparent_at_the_root() {
    let contract = token_contract();
    let bin = contract
        .json_to_bin("account_name", r#""alice""#)
        .expect("encode via alias");
    assert_eq!(bin, Name::from_str("alice").0.to_le_bytes());
    assert_eq!(
        contract.bin_to_json("account_name", &bin).expect("decode"),
        r#""alice""#
    );
}
