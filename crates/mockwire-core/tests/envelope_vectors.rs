//! Envelope vector tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use mockwire_core::protocol::envelope::{decode_frame, encode_frame, Frame};

use vector_loader::load;

#[test]
fn envelope_vectors() {
    let files = [
        "request_handle.json",
        "request_no_data.json",
        "reply_ok.json",
        "reply_not_found.json",
        "zero_id.json",
        "negative_id.json",
        "unknown_field.json",
        "not_json.json",
    ];

    for f in files {
        let v = load(f);
        let res = decode_frame(&v.frame);

        if let Some(err) = v.expect_error {
            let e = res.expect_err("expected error");
            assert_eq!(e.code().as_str(), err.code, "vector={}", v.description);
            continue;
        }

        let frame = res.expect("expected ok frame");
        let ex = v.expect.expect("missing expect block");
        assert_eq!(frame.id().get(), ex["id"].as_u64().unwrap(), "vector={}", v.description);

        match (ex["kind"].as_str().unwrap(), frame) {
            ("request", Frame::Request(req)) => {
                assert_eq!(req.method, ex["method"].as_str().unwrap(), "vector={}", v.description);
            }
            ("reply", Frame::Reply(rep)) => {
                assert_eq!(rep.success, ex["success"].as_bool().unwrap(), "vector={}", v.description);
                if let Some(code) = ex.get("error_code").and_then(|c| c.as_str()) {
                    let err = rep.into_result().expect_err("expected rejection");
                    assert_eq!(err.code().as_str(), code, "vector={}", v.description);
                }
            }
            (kind, other) => panic!("vector={} expected {kind}, got {other:?}", v.description),
        }
    }
}

#[test]
fn encoded_reply_echoes_request_id() {
    let Frame::Request(req) = decode_frame(&load("request_handle.json").frame).unwrap() else {
        panic!("expected request");
    };
    let reply = mockwire_core::protocol::Reply::ok(req.id, serde_json::json!({ "kind": "pass_through" }));
    let text = encode_frame(&reply.into()).unwrap();
    let back: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(back["id"], 41);
    assert_eq!(back["success"], true);
}
