use std::time::Duration;

use balancer_core::AppConfig;
use balancer_dispatcher::Dispatcher;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// 找一段连续空闲端口：Dispatcher在base，Worker占用base+1..=base+n
fn free_port_block(n: u16) -> u16 {
    loop {
        let probe = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = probe.local_addr().unwrap().port();
        drop(probe);
        if base.checked_add(n).is_some()
            && (base..=base + n).all(|p| std::net::TcpListener::bind(("127.0.0.1", p)).is_ok())
        {
            return base;
        }
    }
}

fn test_config(base_port: u16, dest_port: u16, workers: usize, mean_ms: f64) -> AppConfig {
    let mut config = AppConfig::default();
    config.server.name = format!("balancer{base_port}");
    config.server.port = base_port;
    config.server.workers = vec![workers];
    config.service.target_ip = "127.0.0.1".to_string();
    config.service.target_port = dest_port;
    config.service.service_time_mean = mean_ms;
    config.service.service_time_stddev = 0.0;
    config
}

/// 收集下游收到的所有行，标注来自第几条连接
async fn collect_lines(listener: TcpListener, sink: mpsc::UnboundedSender<(usize, String)>) {
    let mut conn_id = 0usize;
    loop {
        let Ok((stream, _)) = listener.accept().await else {
            break;
        };
        let id = conn_id;
        conn_id += 1;
        let sink = sink.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stream).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let _ = sink.send((id, line));
            }
        });
    }
}

#[tokio::test]
async fn test_end_to_end_single_delivery() {
    let dest = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dest_port = dest.local_addr().unwrap().port();
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(collect_lines(dest, tx));

    let base = free_port_block(1);
    let config = test_config(base, dest_port, 1, 10.0);
    let dispatcher = Dispatcher::new(&config).await.unwrap();
    dispatcher.start().await.unwrap();

    let mut client = TcpStream::connect(("127.0.0.1", base)).await.unwrap();
    client.write_all(b"hello\n").await.unwrap();

    let (_, line) = timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(line, "hello");

    // 只送达一次
    assert!(
        timeout(Duration::from_millis(300), rx.recv()).await.is_err(),
        "message delivered more than once"
    );

    dispatcher.stop().await;
}

#[tokio::test]
async fn test_round_robin_across_two_workers() {
    let dest = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dest_port = dest.local_addr().unwrap().port();
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(collect_lines(dest, tx));

    let base = free_port_block(2);
    let config = test_config(base, dest_port, 2, 10.0);
    let dispatcher = Dispatcher::new(&config).await.unwrap();
    dispatcher.start().await.unwrap();

    let mut client = TcpStream::connect(("127.0.0.1", base)).await.unwrap();
    // 间隔发送，保证每条消息在下一条到达前已被取走处理
    for msg in [b"m1\n", b"m2\n", b"m3\n", b"m4\n"] {
        client.write_all(msg).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let mut by_conn: std::collections::HashMap<usize, Vec<String>> = Default::default();
    for _ in 0..4 {
        let (id, line) = timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        by_conn.entry(id).or_default().push(line);
    }

    // 两个Worker各自到下游一条连接，每条各拿到两条消息
    assert_eq!(by_conn.len(), 2, "got {by_conn:?}");
    let mut groups: Vec<Vec<String>> = by_conn.into_values().collect();
    groups.sort();
    // 轮询：m1/m3走同一个Worker，m2/m4走另一个
    assert_eq!(
        groups,
        vec![
            vec!["m1".to_string(), "m3".to_string()],
            vec!["m2".to_string(), "m4".to_string()],
        ]
    );

    dispatcher.stop().await;
}

#[tokio::test]
async fn test_saturated_pipeline_is_lossy_by_design() {
    let dest = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dest_port = dest.local_addr().unwrap().port();
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(collect_lines(dest, tx));

    // 容量1的队列 + 一个慢Worker：三条背靠背消息必然丢一条
    // （要么队列满丢弃，要么单槽邮箱覆盖）
    let base = free_port_block(1);
    let mut config = test_config(base, dest_port, 1, 400.0);
    config.server.queue_capacity = 1;
    let dispatcher = Dispatcher::new(&config).await.unwrap();
    assert_eq!(dispatcher.queue().capacity(), 1);
    dispatcher.start().await.unwrap();

    let mut client = TcpStream::connect(("127.0.0.1", base)).await.unwrap();
    // 先让m1进入Worker处理，再背靠背发两条饱和管道
    client.write_all(b"m1\n").await.unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    client.write_all(b"m2\nm3\n").await.unwrap();

    let mut delivered = Vec::new();
    while let Ok(Some((_, line))) = timeout(Duration::from_secs(2), rx.recv()).await {
        delivered.push(line);
    }

    assert_eq!(delivered.len(), 2, "got {delivered:?}");
    assert_eq!(delivered[0], "m1");
    // 存活的消息都已出队，被丢弃的不会留在队列里
    assert!(dispatcher.queue().is_empty().await);

    dispatcher.stop().await;
}

#[tokio::test]
async fn test_dispatcher_replies_free_to_ping() {
    let dest = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dest_port = dest.local_addr().unwrap().port();

    let base = free_port_block(1);
    let config = test_config(base, dest_port, 1, 10.0);
    let dispatcher = Dispatcher::new(&config).await.unwrap();
    dispatcher.start().await.unwrap();

    let mut client = TcpStream::connect(("127.0.0.1", base)).await.unwrap();
    client.write_all(b"ping\n").await.unwrap();
    let mut buf = [0u8; 16];
    let n = timeout(Duration::from_secs(2), client.read(&mut buf))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(&buf[..n], b"free\n");

    dispatcher.stop().await;
}

#[tokio::test]
async fn test_honors_only_first_worker_count() {
    let dest = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dest_port = dest.local_addr().unwrap().port();

    let base = free_port_block(2);
    let mut config = test_config(base, dest_port, 2, 10.0);
    config.server.workers = vec![2, 8, 16];
    let dispatcher = Dispatcher::new(&config).await.unwrap();
    assert_eq!(dispatcher.worker_count(), 2);
    dispatcher.stop().await;
}
