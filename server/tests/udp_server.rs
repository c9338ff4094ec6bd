//! End-to-end tests over loopback UDP.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{sleep, timeout};
use tokio_test::{assert_err, assert_ok};

use ledgerd_client::{ClientConfig, LedgerClient};
use ledgerd_common::{ClientId, Result};
use ledgerd_protocol::Packet;
use ledgerd_server::state::ServerState;
use ledgerd_server::{LedgerServer, ServerConfig, UdpTransport};

struct Harness {
    server: Arc<LedgerServer>,
    addr: SocketAddr,
    serve: JoinHandle<Result<()>>,
}

async fn start_server() -> Harness {
    start_server_with(ServerConfig::default()).await
}

async fn start_server_with(config: ServerConfig) -> Harness {
    let server = Arc::new(LedgerServer::new(config, "test-node".into()));
    server.start().await.unwrap();

    let transport = UdpTransport::bind("127.0.0.1:0".parse().unwrap())
        .await
        .unwrap();
    let addr = transport.local_addr().unwrap();

    let serving = server.clone();
    let serve = tokio::spawn(async move { serving.serve(&transport).await });

    Harness {
        server,
        addr,
        serve,
    }
}

async fn raw_client() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").await.unwrap()
}

async fn loopback_client(server: SocketAddr) -> LedgerClient {
    let mut config = ClientConfig::for_server(server.to_string());
    config.bind_addr = "127.0.0.1:0".to_string();
    LedgerClient::connect(config).await.unwrap()
}

async fn exchange(socket: &UdpSocket, server: SocketAddr, packet: Packet) -> Packet {
    socket.send_to(&packet.encode(), server).await.unwrap();
    recv_reply(socket, Duration::from_secs(2))
        .await
        .expect("server did not reply")
}

async fn recv_reply(socket: &UdpSocket, wait: Duration) -> Option<Packet> {
    let mut buf = [0u8; 64];
    let (len, _) = timeout(wait, socket.recv_from(&mut buf)).await.ok()?.ok()?;
    Some(Packet::decode(&buf[..len]).unwrap())
}

fn transfer(sequence_number: u32, destination: u32, amount: u32) -> Packet {
    Packet::TransferRequest {
        sequence_number,
        destination: ClientId::new(destination),
        amount,
    }
}

fn ack(sequence_number: u32, balance: u32) -> Packet {
    Packet::TransferAck {
        sequence_number,
        balance,
    }
}

#[tokio::test]
async fn test_protocol_scenarios_over_udp() {
    let harness = start_server().await;
    let socket = raw_client().await;
    let peer = u32::from(Ipv4Addr::new(10, 0, 0, 2));

    // Registration.
    let reply = exchange(&socket, harness.addr, Packet::Discovery { sequence_number: 0 }).await;
    assert_eq!(reply, Packet::DiscoveryAck { sequence_number: 0 });
    assert_eq!(harness.server.ledger().stats().total_balance, 100);

    // Transfer, which also creates the destination account.
    let reply = exchange(&socket, harness.addr, transfer(1, peer, 30)).await;
    assert_eq!(reply, ack(1, 70));

    // Replay.
    let reply = exchange(&socket, harness.addr, transfer(1, peer, 30)).await;
    assert_eq!(reply, ack(1, 70));

    // Insufficient funds.
    let reply = exchange(&socket, harness.addr, transfer(2, peer, 1000)).await;
    assert_eq!(reply, ack(2, 70));

    // Sequence gap.
    let reply = exchange(&socket, harness.addr, transfer(5, peer, 10)).await;
    assert_eq!(reply, ack(2, 70));

    let stats = harness.server.ledger().stats();
    assert_eq!(stats.transaction_count, 1);
    assert_eq!(stats.total_transferred, 30);
    assert_eq!(stats.total_balance, 200);
    assert_eq!(
        harness.server.ledger().account(ClientId::new(peer)).unwrap().balance,
        130
    );

    let report = assert_ok!(harness.server.stop().await).unwrap();
    assert_eq!(report.last.stats, stats);
    assert_ok!(harness.serve.await.unwrap());
    assert_eq!(harness.server.state(), ServerState::Stopped);
}

#[tokio::test]
async fn test_invalid_datagrams_get_no_reply() {
    let harness = start_server().await;
    let socket = raw_client().await;

    // Too short.
    socket.send_to(&[0, 1, 0], harness.addr).await.unwrap();
    // Undefined kind.
    let mut unknown = [0u8; 16];
    unknown[1] = 9;
    socket.send_to(&unknown, harness.addr).await.unwrap();
    // Acknowledgments are never answered.
    socket
        .send_to(&ack(1, 1).encode(), harness.addr)
        .await
        .unwrap();

    assert!(recv_reply(&socket, Duration::from_millis(200)).await.is_none());

    // The server keeps serving, and the datagrams above were handled first.
    let reply = exchange(&socket, harness.addr, Packet::Discovery { sequence_number: 3 }).await;
    assert_eq!(reply, Packet::DiscoveryAck { sequence_number: 3 });

    let metrics = harness.server.metrics().snapshot();
    assert_eq!(metrics.datagrams_received, 4);
    assert_eq!(metrics.malformed_dropped, 1);
    assert_eq!(metrics.unknown_kind_dropped, 1);
    assert_eq!(metrics.ignored_packets, 1);
    assert_eq!(metrics.acks_sent, 1);
    assert_eq!(harness.server.ledger().account_count(), 1);

    assert_ok!(harness.server.stop().await);
    assert_ok!(harness.serve.await.unwrap());
}

#[tokio::test]
async fn test_client_library_round_trip() {
    let harness = start_server().await;

    let mut client = loopback_client(harness.addr).await;

    client.discover().await.unwrap();
    // Repeated discovery grants nothing more.
    client.discover().await.unwrap();

    let dest = ClientId::from(Ipv4Addr::new(10, 0, 0, 1));
    let first = client.transfer(dest, 25).await.unwrap();
    assert_eq!(first.sequence_number, 1);
    assert_eq!(first.balance, 75);

    let second = client.transfer(dest, 500).await.unwrap();
    assert_eq!(second.sequence_number, 2);
    assert_eq!(second.balance, 75);

    assert_eq!(client.last_balance(), Some(75));
    assert_eq!(client.next_sequence(), Some(3));

    let stats = harness.server.ledger().stats();
    assert_eq!(stats.total_balance, 200);
    assert_eq!(stats.transaction_count, 1);
    assert_ok!(harness.server.ledger().verify_integrity());

    assert_ok!(harness.server.stop().await);
    assert_ok!(harness.serve.await.unwrap());
    assert_err!(harness.server.stop().await);
}

#[tokio::test]
async fn test_stop_reports_final_stats() {
    let harness = start_server().await;
    let socket = raw_client().await;
    let dest = u32::from(Ipv4Addr::new(10, 0, 0, 3));

    exchange(&socket, harness.addr, Packet::Discovery { sequence_number: 0 }).await;
    for seq in 1..=10 {
        let reply = exchange(&socket, harness.addr, transfer(seq, dest, 1)).await;
        assert_eq!(reply, ack(seq, 100 - seq));
    }

    let report = assert_ok!(harness.server.stop().await).unwrap();
    assert_eq!(report.last.stats.transaction_count, 10);
    assert_eq!(report.last.stats.total_transferred, 10);
    assert!(harness.server.ledger().is_closed());

    // Nothing is served after stop.
    harness.serve.await.unwrap().unwrap();
    socket
        .send_to(&Packet::Discovery { sequence_number: 1 }.encode(), harness.addr)
        .await
        .unwrap();
    assert!(recv_reply(&socket, Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn test_later_client_continues_host_sequence() {
    let dest = ClientId::from(Ipv4Addr::new(10, 0, 0, 5));

    for earlier_transfers in [1u32, 3] {
        let harness = start_server().await;

        {
            let mut first = loopback_client(harness.addr).await;
            first.discover().await.unwrap();
            for _ in 0..earlier_transfers {
                first.transfer(dest, 10).await.unwrap();
            }
        }

        // Same host, new socket: the account and its sequence carry over.
        let mut second = loopback_client(harness.addr).await;
        second.discover().await.unwrap();
        let ack = second.transfer(dest, 10).await.unwrap();

        let expected_seq = earlier_transfers + 1;
        assert_eq!(ack.sequence_number, expected_seq);
        assert_eq!(ack.balance, 100 - 10 * expected_seq);
        assert_eq!(second.next_sequence(), Some(expected_seq + 1));

        let stats = harness.server.ledger().stats();
        assert_eq!(stats.transaction_count, u64::from(expected_seq));
        assert_eq!(
            harness.server.ledger().account(dest).unwrap().balance,
            100 + 10 * i64::from(expected_seq)
        );
        assert_ok!(harness.server.ledger().verify_integrity());

        assert_ok!(harness.server.stop().await);
        assert_ok!(harness.serve.await.unwrap());
    }
}

#[cfg(target_os = "linux")]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_senders_through_bounded_dispatch() {
    const SENDERS: u8 = 32;

    let mut config = ServerConfig::default();
    config.dispatch.max_concurrent_transfers = 2;
    let harness = start_server_with(config).await;

    // Each sender has its own loopback address, and so its own account.
    let sender_ip = |index: u8| Ipv4Addr::new(127, 0, 0, 10 + index);

    let mut senders = JoinSet::new();
    for index in 0..SENDERS {
        let server = harness.addr;
        let me = sender_ip(index);
        let peer = u32::from(sender_ip((index + 1) % SENDERS));

        senders.spawn(async move {
            let socket = UdpSocket::bind((me, 0)).await.unwrap();
            let token = u32::from(index);
            let reply = exchange(&socket, server, Packet::Discovery { sequence_number: token }).await;
            assert_eq!(reply, Packet::DiscoveryAck { sequence_number: token });

            let reply = exchange(&socket, server, transfer(1, peer, 10)).await;
            // Exactly one reply per request.
            assert!(recv_reply(&socket, Duration::from_millis(100)).await.is_none());
            reply
        });
    }

    while let Some(reply) = senders.join_next().await {
        match reply.unwrap() {
            Packet::TransferAck {
                sequence_number,
                balance,
            } => {
                assert_eq!(sequence_number, 1);
                // 100 when the peer's payment landed first.
                assert!(balance == 90 || balance == 100, "balance {balance}");
            }
            other => panic!("unexpected reply: {other:?}"),
        }
    }

    let ledger = harness.server.ledger();
    let stats = ledger.stats();
    assert_eq!(ledger.account_count(), usize::from(SENDERS));
    assert_eq!(stats.transaction_count, u64::from(SENDERS));
    assert_eq!(stats.total_transferred, 10 * u64::from(SENDERS));
    assert_eq!(stats.total_balance, 100 * i64::from(SENDERS));
    for index in 0..SENDERS {
        let account = ledger.account(ClientId::from(sender_ip(index))).unwrap();
        assert_eq!(account.balance, 100);
        assert_eq!(account.last_sequence, 1);
    }
    assert_ok!(ledger.verify_integrity());

    let counters = harness.server.metrics().snapshot();
    assert_eq!(counters.discoveries, u64::from(SENDERS));
    assert_eq!(counters.transfers_applied, u64::from(SENDERS));
    assert_eq!(counters.acks_sent, 2 * u64::from(SENDERS));

    let report = assert_ok!(harness.server.stop().await).unwrap();
    assert_eq!(report.last.stats, stats);
    assert_ok!(harness.serve.await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_drains_dispatched_transfers() {
    let mut config = ServerConfig::default();
    config.dispatch.max_concurrent_transfers = 1;
    let harness = start_server_with(config).await;
    let socket = raw_client().await;
    let dest = u32::from(Ipv4Addr::new(10, 0, 0, 6));

    exchange(&socket, harness.addr, Packet::Discovery { sequence_number: 0 }).await;
    for seq in 1..=200 {
        socket
            .send_to(&transfer(seq, dest, 1).encode(), harness.addr)
            .await
            .unwrap();
    }

    let metrics = harness.server.metrics().clone();
    assert_ok!(
        timeout(Duration::from_secs(2), async {
            while metrics.snapshot().datagrams_received < 50 {
                sleep(Duration::from_millis(1)).await;
            }
        })
        .await
    );

    let report = assert_ok!(harness.server.stop().await).unwrap();

    // Every transfer handed to a task was acknowledged before stop returned.
    let counters = harness.server.metrics().snapshot();
    assert_eq!(counters.send_failures, 0);
    assert_eq!(counters.acks_sent, counters.discoveries + counters.transfers_total());

    let stats = harness.server.ledger().stats();
    assert_eq!(stats.transaction_count, counters.transfers_applied);
    assert_eq!(report.last.stats, stats);
    assert_ok!(harness.server.ledger().verify_integrity());
    assert_ok!(harness.serve.await.unwrap());
}
