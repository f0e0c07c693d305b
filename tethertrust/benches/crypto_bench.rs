// TetherTrust cryptographic benchmarks using criterion.
//
// Measures:
//   - Ed25519 sign / verify over SHA-256 digests
//   - Session key wrap / unwrap
//   - Handshake record encode / decode
//   - Full handshake round trip (both sides, no I/O)

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use tethertrust::crypto::wrap;
use tethertrust::handshake::codec;
use tethertrust::{HandshakeContext, HandshakeInitiator, HandshakeResponder, IdentityKeyPair};

fn bench_sign_verify(c: &mut Criterion) {
    let kp = IdentityKeyPair::generate("bench").unwrap();
    let peer = kp.public();
    let message = [0x41u8; 116];

    c.bench_function("sign", |b| {
        b.iter(|| black_box(kp.sign(black_box(&message)).unwrap()));
    });

    let sig = kp.sign(&message).unwrap();
    c.bench_function("verify", |b| {
        b.iter(|| peer.verify(black_box(&message), black_box(&sig)).unwrap());
    });
}

fn bench_wrap(c: &mut Criterion) {
    let recipient = IdentityKeyPair::generate("bench").unwrap();
    let peer = recipient.public();
    let key = [0x5Au8; 32];

    c.bench_function("wrap_session_key", |b| {
        b.iter(|| black_box(wrap::wrap(black_box(&key), &peer).unwrap()));
    });

    let wrapped = wrap::wrap(&key, &peer).unwrap();
    c.bench_function("unwrap_session_key", |b| {
        b.iter(|| black_box(wrap::unwrap(black_box(&wrapped), &recipient).unwrap()));
    });
}

fn contexts() -> (Arc<HandshakeContext>, Arc<HandshakeContext>) {
    let client = IdentityKeyPair::generate("client").unwrap();
    let server = IdentityKeyPair::generate("server").unwrap();
    let (client_pub, server_pub) = (client.public(), server.public());
    (
        Arc::new(HandshakeContext::new(client, server_pub)),
        Arc::new(HandshakeContext::new(server, client_pub)),
    )
}

fn bench_codec(c: &mut Criterion) {
    let (client_ctx, _) = contexts();
    let request = HandshakeInitiator::new(client_ctx).create_request().unwrap();

    c.bench_function("encode_request", |b| {
        b.iter(|| black_box(codec::encode_request(black_box(&request)).unwrap()));
    });

    let encoded = codec::encode_request(&request).unwrap();
    c.bench_function("decode_request", |b| {
        b.iter(|| {
            let mut buf = encoded.clone();
            black_box(codec::decode_request(&mut buf).unwrap())
        });
    });
}

fn bench_handshake(c: &mut Criterion) {
    let (client_ctx, server_ctx) = contexts();
    let responder = HandshakeResponder::new(server_ctx);

    c.bench_function("handshake_round_trip", |b| {
        b.iter(|| {
            let mut initiator = HandshakeInitiator::new(client_ctx.clone());
            let request = initiator.create_request().unwrap();
            let (reply, _) = responder.respond(&request).unwrap();
            black_box(initiator.process_reply(&reply).unwrap())
        });
    });
}

criterion_group!(benches, bench_sign_verify, bench_wrap, bench_codec, bench_handshake);
criterion_main!(benches);
