//! Event Filtering and Watching
//!
//! - `filter_*` query a closed block range (chunked to stay under RPC
//!   limits) and return typed records in the order the node returned them.
//! - `watch_*` start a background poller that forwards every new record to a
//!   caller-supplied channel until [`WatchHandle::unsubscribe`] is called or
//!   the receiver is dropped. The first RPC or decode error stops the poller
//!   and is returned from [`WatchHandle::unsubscribe`] / [`WatchHandle::join`].
//! - [`wait_for_receipt`] waits for a transaction to be buried under a number
//!   of confirmations.
//!
//! ## Usage
//!
//! ```ignore
//! let watcher = BridgeWatcher::new(provider, bridge_address);
//! let requests = watcher.filter_redeem_request_v2(from_block, to_block, Some(user)).await?;
//!
//! let (tx, mut rx) = tokio::sync::mpsc::channel(64);
//! let handle = watcher.watch_lock_v2(None, tx).await?;
//! while let Some(lock) = rx.recv().await { /* ... */ }
//! handle.unsubscribe().await?;
//! ```

use alloy::{
    primitives::{Address, TxHash, B256},
    providers::Provider,
    rpc::types::{Filter, Log, TransactionReceipt},
    sol_types::SolEvent,
    transports::Transport,
};
use eyre::{eyre, Result, WrapErr};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::contracts::{ERC20Basic, LockRedeem, LockRedeemERC, LockRedeemV2};
use crate::events::{
    decode_approval, decode_record, decode_transfer, AddValidatorEvent, ApprovalEvent,
    DeleteValidatorEvent, FromSolEvent, LockEvent, NewEpochEvent, NewThresholdEvent,
    RedeemRequestEvent, RedeemSuccessfulEvent, TransferEvent, ValidatorMigratedEvent,
    ValidatorSignedRedeemEvent,
};

/// Confirmations required before a transaction counts as final
pub const DEFAULT_CONFIRMATIONS: u64 = 12;

/// Watcher configuration
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Poll interval for `watch_*` and receipt waits
    pub poll_interval: Duration,
    /// Maximum block range per `eth_getLogs` query
    pub max_block_range: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_block_range: 10_000,
        }
    }
}

/// Fetch logs matching `filter` between `from_block` and `to_block`, inclusive
async fn fetch_logs<T, P>(
    provider: &P,
    filter: &Filter,
    from_block: u64,
    to_block: u64,
    max_block_range: u64,
) -> Result<Vec<Log>>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let step = max_block_range.max(1);
    let mut all_logs = Vec::new();
    let mut current_from = from_block;

    while current_from <= to_block {
        let current_to = current_from.saturating_add(step - 1).min(to_block);
        let chunk = filter.clone().from_block(current_from).to_block(current_to);

        let logs = provider.get_logs(&chunk).await.wrap_err_with(|| {
            format!(
                "Failed to get logs from block {} to {}",
                current_from, current_to
            )
        })?;

        all_logs.extend(logs);
        current_from = match current_to.checked_add(1) {
            Some(next) => next,
            None => break,
        };
    }

    Ok(all_logs)
}

/// Run `fut` unless `quit` fires first
async fn or_quit<F: Future>(quit: &mut oneshot::Receiver<()>, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = quit => None,
        out = fut => Some(out),
    }
}

/// Body of a `watch_*` task
///
/// Every await races `quit`, including a send into a full sink.
async fn poll_records<T, P, E, R>(
    provider: P,
    filter: Filter,
    config: WatcherConfig,
    mut next_block: u64,
    mut quit: oneshot::Receiver<()>,
    sink: mpsc::Sender<R>,
) -> Result<()>
where
    T: Transport + Clone,
    P: Provider<T>,
    E: SolEvent,
    R: FromSolEvent<E>,
{
    loop {
        if or_quit(&mut quit, tokio::time::sleep(config.poll_interval))
            .await
            .is_none()
        {
            break;
        }

        let Some(head) = or_quit(&mut quit, provider.get_block_number()).await else {
            break;
        };
        let head = head.map_err(|e| eyre!("Failed to get block number: {}", e))?;
        if head < next_block {
            continue;
        }

        let fetch = fetch_logs(&provider, &filter, next_block, head, config.max_block_range);
        let Some(logs) = or_quit(&mut quit, fetch).await else {
            break;
        };
        let logs = logs?;

        for log in &logs {
            let Some(record) = decode_record::<E, R>(log)? else {
                continue;
            };
            match or_quit(&mut quit, sink.send(record)).await {
                None => {
                    debug!(event = E::SIGNATURE, "Watch unsubscribed");
                    return Ok(());
                }
                Some(Err(_)) => {
                    debug!(event = E::SIGNATURE, "Watch receiver dropped");
                    return Ok(());
                }
                Some(Ok(())) => {}
            }
        }

        next_block = match head.checked_add(1) {
            Some(next) => next,
            None => break,
        };
    }

    debug!(event = E::SIGNATURE, "Watch unsubscribed");
    Ok(())
}

/// Handle to a running `watch_*` poller
#[derive(Debug)]
pub struct WatchHandle {
    quit: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<()>>,
}

impl WatchHandle {
    /// Stop the poller and return the error it stopped on, if any
    pub async fn unsubscribe(mut self) -> Result<()> {
        if let Some(quit) = self.quit.take() {
            // poller already gone when this fails; its result is still in the task
            let _ = quit.send(());
        }
        self.join().await
    }

    /// Wait for the poller to end on its own (error or dropped receiver)
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| eyre!("Watch task panicked: {}", e))?
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Event watcher for one bridge or token contract
pub struct BridgeWatcher<T, P> {
    provider: P,
    address: Address,
    config: WatcherConfig,
    _transport: std::marker::PhantomData<T>,
}

impl<T, P> BridgeWatcher<T, P>
where
    T: Transport + Clone,
    P: Provider<T> + Clone + 'static,
{
    pub fn new(provider: P, address: Address) -> Self {
        Self::with_config(provider, address, WatcherConfig::default())
    }

    pub fn with_config(provider: P, address: Address, config: WatcherConfig) -> Self {
        Self {
            provider,
            address,
            config,
            _transport: std::marker::PhantomData,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    fn event_filter<E: SolEvent>(&self, topic1: Option<B256>, topic2: Option<B256>) -> Filter {
        let mut filter = Filter::new()
            .address(self.address)
            .event_signature(E::SIGNATURE_HASH);
        if let Some(topic) = topic1 {
            filter = filter.topic1(topic);
        }
        if let Some(topic) = topic2 {
            filter = filter.topic2(topic);
        }
        filter
    }

    // =========================================================================
    // Range Queries
    // =========================================================================

    /// All logs of the contract in a block range
    pub async fn get_logs(&self, from_block: u64, to_block: u64) -> Result<Vec<Log>> {
        let filter = Filter::new().address(self.address);
        fetch_logs(
            &self.provider,
            &filter,
            from_block,
            to_block,
            self.config.max_block_range,
        )
        .await
    }

    async fn filter_records<E, R>(
        &self,
        topic1: Option<B256>,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<R>>
    where
        E: SolEvent,
        R: FromSolEvent<E>,
    {
        let filter = self.event_filter::<E>(topic1, None);
        let logs = fetch_logs(
            &self.provider,
            &filter,
            from_block,
            to_block,
            self.config.max_block_range,
        )
        .await?;

        let mut records = Vec::with_capacity(logs.len());
        for log in &logs {
            if let Some(record) = decode_record::<E, R>(log)? {
                records.push(record);
            }
        }

        if !records.is_empty() {
            debug!(
                event = E::SIGNATURE,
                count = records.len(),
                from = from_block,
                to = to_block,
                "Found events"
            );
        }

        Ok(records)
    }

    pub async fn filter_lock(&self, from_block: u64, to_block: u64) -> Result<Vec<LockEvent>> {
        self.filter_records::<LockRedeem::Lock, _>(None, from_block, to_block)
            .await
    }

    pub async fn filter_lock_v2(&self, from_block: u64, to_block: u64) -> Result<Vec<LockEvent>> {
        self.filter_records::<LockRedeemV2::Lock, _>(None, from_block, to_block)
            .await
    }

    /// v1 redeem requests, optionally for one recipient
    pub async fn filter_redeem_request(
        &self,
        from_block: u64,
        to_block: u64,
        recipient: Option<Address>,
    ) -> Result<Vec<RedeemRequestEvent>> {
        self.filter_records::<LockRedeem::RedeemRequest, _>(
            recipient.map(Address::into_word),
            from_block,
            to_block,
        )
        .await
    }

    /// v2 redeem requests (with fee), optionally for one recipient
    pub async fn filter_redeem_request_v2(
        &self,
        from_block: u64,
        to_block: u64,
        recipient: Option<Address>,
    ) -> Result<Vec<RedeemRequestEvent>> {
        self.filter_records::<LockRedeemV2::RedeemRequest, _>(
            recipient.map(Address::into_word),
            from_block,
            to_block,
        )
        .await
    }

    pub async fn filter_validator_signed_redeem(
        &self,
        from_block: u64,
        to_block: u64,
        recipient: Option<Address>,
    ) -> Result<Vec<ValidatorSignedRedeemEvent>> {
        self.filter_records::<LockRedeem::ValidatorSignedRedeem, _>(
            recipient.map(Address::into_word),
            from_block,
            to_block,
        )
        .await
    }

    pub async fn filter_validator_signed_redeem_v2(
        &self,
        from_block: u64,
        to_block: u64,
        recipient: Option<Address>,
    ) -> Result<Vec<ValidatorSignedRedeemEvent>> {
        self.filter_records::<LockRedeemV2::ValidatorSignedRedeem, _>(
            recipient.map(Address::into_word),
            from_block,
            to_block,
        )
        .await
    }

    pub async fn filter_redeem_successful(
        &self,
        from_block: u64,
        to_block: u64,
        recipient: Option<Address>,
    ) -> Result<Vec<RedeemSuccessfulEvent>> {
        self.filter_records::<LockRedeemERC::RedeemSuccessful, _>(
            recipient.map(Address::into_word),
            from_block,
            to_block,
        )
        .await
    }

    pub async fn filter_add_validator(
        &self,
        from_block: u64,
        to_block: u64,
        validator: Option<Address>,
    ) -> Result<Vec<AddValidatorEvent>> {
        self.filter_records::<LockRedeem::AddValidator, _>(
            validator.map(Address::into_word),
            from_block,
            to_block,
        )
        .await
    }

    pub async fn filter_add_validator_v2(
        &self,
        from_block: u64,
        to_block: u64,
        validator: Option<Address>,
    ) -> Result<Vec<AddValidatorEvent>> {
        self.filter_records::<LockRedeemV2::AddValidator, _>(
            validator.map(Address::into_word),
            from_block,
            to_block,
        )
        .await
    }

    pub async fn filter_delete_validator(
        &self,
        from_block: u64,
        to_block: u64,
        validator: Option<Address>,
    ) -> Result<Vec<DeleteValidatorEvent>> {
        self.filter_records::<LockRedeem::DeleteValidator, _>(
            validator.map(Address::into_word),
            from_block,
            to_block,
        )
        .await
    }

    pub async fn filter_new_threshold(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<NewThresholdEvent>> {
        self.filter_records::<LockRedeem::NewThreshold, _>(None, from_block, to_block)
            .await
    }

    pub async fn filter_new_epoch(&self, from_block: u64, to_block: u64) -> Result<Vec<NewEpochEvent>> {
        self.filter_records::<LockRedeem::NewEpoch, _>(None, from_block, to_block)
            .await
    }

    pub async fn filter_validator_migrated(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<ValidatorMigratedEvent>> {
        self.filter_records::<LockRedeemV2::ValidatorMigrated, _>(None, from_block, to_block)
            .await
    }

    /// Token transfers, optionally narrowed by sender and / or receiver
    pub async fn filter_transfer(
        &self,
        from_block: u64,
        to_block: u64,
        from: Option<Address>,
        to: Option<Address>,
    ) -> Result<Vec<TransferEvent>> {
        let filter = self.event_filter::<ERC20Basic::Transfer>(
            from.map(Address::into_word),
            to.map(Address::into_word),
        );
        let logs = fetch_logs(
            &self.provider,
            &filter,
            from_block,
            to_block,
            self.config.max_block_range,
        )
        .await?;

        let mut records = Vec::with_capacity(logs.len());
        for log in &logs {
            if let Some(record) = decode_transfer(log)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    pub async fn filter_approval(
        &self,
        from_block: u64,
        to_block: u64,
        owner: Option<Address>,
        spender: Option<Address>,
    ) -> Result<Vec<ApprovalEvent>> {
        let filter = self.event_filter::<ERC20Basic::Approval>(
            owner.map(Address::into_word),
            spender.map(Address::into_word),
        );
        let logs = fetch_logs(
            &self.provider,
            &filter,
            from_block,
            to_block,
            self.config.max_block_range,
        )
        .await?;

        let mut records = Vec::with_capacity(logs.len());
        for log in &logs {
            if let Some(record) = decode_approval(log)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    // =========================================================================
    // Watching
    // =========================================================================

    /// Forward every new `E` log, decoded as `R`, to `sink`
    ///
    /// Starts at `start_block`, or at the block after the current head.
    pub async fn watch_records<E, R>(
        &self,
        topic1: Option<B256>,
        start_block: Option<u64>,
        sink: mpsc::Sender<R>,
    ) -> Result<WatchHandle>
    where
        T: Send + Sync + 'static,
        P: Send + Sync,
        E: SolEvent + Send + 'static,
        R: FromSolEvent<E> + Send + 'static,
    {
        let provider = self.provider.clone();
        let filter = self.event_filter::<E>(topic1, None);
        let config = self.config.clone();

        let next_block = match start_block {
            Some(block) => block,
            None => provider
                .get_block_number()
                .await
                .map_err(|e| eyre!("Failed to get block number: {}", e))?
                .saturating_add(1),
        };

        let (quit_tx, quit_rx) = oneshot::channel();

        info!(
            address = %self.address,
            event = E::SIGNATURE,
            start_block = next_block,
            "Watching events"
        );

        let task = tokio::spawn(poll_records::<T, P, E, R>(
            provider, filter, config, next_block, quit_rx, sink,
        ));

        Ok(WatchHandle {
            quit: Some(quit_tx),
            task,
        })
    }

    pub async fn watch_lock(
        &self,
        start_block: Option<u64>,
        sink: mpsc::Sender<LockEvent>,
    ) -> Result<WatchHandle>
    where
        T: Send + Sync + 'static,
        P: Send + Sync,
    {
        self.watch_records::<LockRedeem::Lock, _>(None, start_block, sink)
            .await
    }

    pub async fn watch_lock_v2(
        &self,
        start_block: Option<u64>,
        sink: mpsc::Sender<LockEvent>,
    ) -> Result<WatchHandle>
    where
        T: Send + Sync + 'static,
        P: Send + Sync,
    {
        self.watch_records::<LockRedeemV2::Lock, _>(None, start_block, sink)
            .await
    }

    pub async fn watch_redeem_request(
        &self,
        recipient: Option<Address>,
        start_block: Option<u64>,
        sink: mpsc::Sender<RedeemRequestEvent>,
    ) -> Result<WatchHandle>
    where
        T: Send + Sync + 'static,
        P: Send + Sync,
    {
        self.watch_records::<LockRedeem::RedeemRequest, _>(
            recipient.map(Address::into_word),
            start_block,
            sink,
        )
        .await
    }

    pub async fn watch_redeem_request_v2(
        &self,
        recipient: Option<Address>,
        start_block: Option<u64>,
        sink: mpsc::Sender<RedeemRequestEvent>,
    ) -> Result<WatchHandle>
    where
        T: Send + Sync + 'static,
        P: Send + Sync,
    {
        self.watch_records::<LockRedeemV2::RedeemRequest, _>(
            recipient.map(Address::into_word),
            start_block,
            sink,
        )
        .await
    }

    pub async fn watch_validator_signed_redeem(
        &self,
        recipient: Option<Address>,
        start_block: Option<u64>,
        sink: mpsc::Sender<ValidatorSignedRedeemEvent>,
    ) -> Result<WatchHandle>
    where
        T: Send + Sync + 'static,
        P: Send + Sync,
    {
        self.watch_records::<LockRedeem::ValidatorSignedRedeem, _>(
            recipient.map(Address::into_word),
            start_block,
            sink,
        )
        .await
    }

    pub async fn watch_validator_signed_redeem_v2(
        &self,
        recipient: Option<Address>,
        start_block: Option<u64>,
        sink: mpsc::Sender<ValidatorSignedRedeemEvent>,
    ) -> Result<WatchHandle>
    where
        T: Send + Sync + 'static,
        P: Send + Sync,
    {
        self.watch_records::<LockRedeemV2::ValidatorSignedRedeem, _>(
            recipient.map(Address::into_word),
            start_block,
            sink,
        )
        .await
    }

    pub async fn watch_add_validator(
        &self,
        start_block: Option<u64>,
        sink: mpsc::Sender<AddValidatorEvent>,
    ) -> Result<WatchHandle>
    where
        T: Send + Sync + 'static,
        P: Send + Sync,
    {
        self.watch_records::<LockRedeem::AddValidator, _>(None, start_block, sink)
            .await
    }

    pub async fn watch_new_threshold(
        &self,
        start_block: Option<u64>,
        sink: mpsc::Sender<NewThresholdEvent>,
    ) -> Result<WatchHandle>
    where
        T: Send + Sync + 'static,
        P: Send + Sync,
    {
        self.watch_records::<LockRedeem::NewThreshold, _>(None, start_block, sink)
            .await
    }

    pub async fn watch_validator_migrated(
        &self,
        start_block: Option<u64>,
        sink: mpsc::Sender<ValidatorMigratedEvent>,
    ) -> Result<WatchHandle>
    where
        T: Send + Sync + 'static,
        P: Send + Sync,
    {
        self.watch_records::<LockRedeemV2::ValidatorMigrated, _>(None, start_block, sink)
            .await
    }
}

// ============================================================================
// Finality
// ============================================================================

/// Wait until `tx_hash` is mined and `confirmations` blocks deep
///
/// One confirmation means "mined". A reverted transaction is an error.
pub async fn wait_for_receipt<T, P>(
    provider: &P,
    tx_hash: TxHash,
    confirmations: u64,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<TransactionReceipt>
where
    T: Transport + Clone,
    P: Provider<T>,
{
    let start = Instant::now();

    while start.elapsed() < timeout {
        let receipt = provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| eyre!("Failed to get receipt for {}: {}", tx_hash, e))?;

        if let Some(receipt) = receipt {
            if !receipt.status() {
                return Err(eyre!("Transaction {} reverted", tx_hash));
            }

            let Some(mined_in) = receipt.block_number else {
                tokio::time::sleep(poll_interval).await;
                continue;
            };

            let head = provider
                .get_block_number()
                .await
                .map_err(|e| eyre!("Failed to get block number: {}", e))?;

            if confirmation_depth(head, mined_in) >= confirmations {
                info!(
                    tx_hash = %tx_hash,
                    block = mined_in,
                    confirmations = confirmations,
                    "Transaction final"
                );
                return Ok(receipt);
            }
        }

        tokio::time::sleep(poll_interval).await;
    }

    warn!(tx_hash = %tx_hash, timeout = ?timeout, "Timed out waiting for receipt");
    Err(eyre!(
        "Timeout waiting for {} confirmations of {} after {:?}",
        confirmations,
        tx_hash,
        timeout
    ))
}

/// Blocks on top of (and including) the mining block
fn confirmation_depth(head: u64, mined_in: u64) -> u64 {
    if head < mined_in {
        0
    } else {
        head - mined_in + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watcher_config_default() {
        let config = WatcherConfig::default();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.max_block_range, 10_000);
    }

    #[test]
    fn test_confirmation_depth() {
        assert_eq!(confirmation_depth(100, 100), 1);
        assert_eq!(confirmation_depth(111, 100), 12);
        assert_eq!(confirmation_depth(99, 100), 0);
    }

    #[test]
    fn test_event_filter_topics() {
        let provider = alloy::providers::ProviderBuilder::new()
            .on_http("http://127.0.0.1:8545".parse().unwrap());
        let bridge = Address::repeat_byte(0x0b);
        let watcher = BridgeWatcher::new(provider, bridge);

        let recipient = Address::repeat_byte(0xee);
        let filter =
            watcher.event_filter::<LockRedeemV2::RedeemRequest>(Some(recipient.into_word()), None);

        assert!(filter.address.matches(&bridge));
        assert!(filter.topics[0].matches(&LockRedeemV2::RedeemRequest::SIGNATURE_HASH));
        assert!(filter.topics[1].matches(&recipient.into_word()));
        assert!(!filter.topics[1].matches(&Address::repeat_byte(0x01).into_word()));
        assert!(filter.topics[2].is_empty());
    }

    // ------------------------------------------------------------------
    // Forwarder against a local JSON-RPC node
    // ------------------------------------------------------------------

    use crate::events::tests::{mined_log, BRIDGE};
    use alloy::primitives::U256;
    use alloy::providers::{ProviderBuilder, RootProvider};
    use alloy::transports::http::{Client, Http};
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const WAIT: Duration = Duration::from_secs(5);

    /// Fixed chain head and a fixed `eth_getLogs` answer
    struct StubNode {
        head: u64,
        logs: Vec<Log>,
        fail_get_logs: bool,
    }

    impl StubNode {
        fn answer(&self, request: &Value) -> Value {
            let id = request["id"].clone();
            match request["method"].as_str() {
                Some("eth_blockNumber") => {
                    json!({ "jsonrpc": "2.0", "id": id, "result": format!("0x{:x}", self.head) })
                }
                Some("eth_getLogs") if self.fail_get_logs => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32000, "message": "backend unavailable" }
                }),
                Some("eth_getLogs") => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "result": serde_json::to_value(&self.logs).unwrap()
                }),
                _ => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32601, "message": "method not found" }
                }),
            }
        }
    }

    async fn serve_connection(mut stream: TcpStream, node: Arc<StubNode>) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let header_end = loop {
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
                match stream.read(&mut chunk).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                }
            };

            let headers = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
            let body_len = headers
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);

            while buf.len() < header_end + body_len {
                match stream.read(&mut chunk).await {
                    Ok(0) | Err(_) => return,
                    Ok(n) => buf.extend_from_slice(&chunk[..n]),
                }
            }

            let request: Vec<u8> = buf.drain(..header_end + body_len).skip(header_end).collect();
            let request: Value = serde_json::from_slice(&request).unwrap();
            let body = node.answer(&request).to_string();
            let reply = format!(
                "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
                body.len(),
                body
            );
            if stream.write_all(reply.as_bytes()).await.is_err() {
                return;
            }
        }
    }

    async fn stub_provider(node: StubNode) -> RootProvider<Http<Client>> {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let node = Arc::new(node);
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(stream, node.clone()));
            }
        });
        ProviderBuilder::new().on_http(url.parse().unwrap())
    }

    fn lock_log(amount: u64, index: u64) -> Log {
        let event = LockRedeem::Lock {
            sender: Address::repeat_byte(0x0a),
            amount_received: U256::from(amount),
        };
        mined_log(event.encode_log_data(), 1, index)
    }

    fn fast_config() -> WatcherConfig {
        WatcherConfig {
            poll_interval: Duration::from_millis(10),
            max_block_range: 100,
        }
    }

    #[tokio::test]
    async fn test_watch_forwards_in_node_order_and_skips_pending() {
        let mut pending = lock_log(9, 1);
        pending.block_number = None;
        let provider = stub_provider(StubNode {
            head: 1,
            logs: vec![lock_log(1, 0), pending, lock_log(2, 2)],
            fail_get_logs: false,
        })
        .await;
        let watcher = BridgeWatcher::with_config(provider, BRIDGE, fast_config());

        let (tx, mut rx) = mpsc::channel(8);
        let handle = watcher.watch_lock(Some(1), tx).await.unwrap();

        let first = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        let second = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(first.amount_received, U256::from(1));
        assert_eq!(first.log_index, 0);
        assert_eq!(second.amount_received, U256::from(2));
        assert_eq!(second.log_index, 2);

        tokio::time::timeout(WAIT, handle.unsubscribe())
            .await
            .unwrap()
            .unwrap();
        // head never moves, so nothing else was forwarded
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_while_sink_is_full() {
        let provider = stub_provider(StubNode {
            head: 1,
            logs: vec![lock_log(1, 0), lock_log(2, 1), lock_log(3, 2)],
            fail_get_logs: false,
        })
        .await;
        let watcher = BridgeWatcher::with_config(provider, BRIDGE, fast_config());

        let (tx, mut rx) = mpsc::channel(1);
        let handle = watcher.watch_lock(Some(1), tx).await.unwrap();

        let first = tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap();
        assert_eq!(first.amount_received, U256::from(1));

        // second record fills the channel, the third send parks
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!handle.is_finished());

        tokio::time::timeout(WAIT, handle.unsubscribe())
            .await
            .expect("unsubscribe must not wait on the full sink")
            .unwrap();
        drop(rx);
    }

    #[tokio::test]
    async fn test_dropped_receiver_ends_watch_quietly() {
        let provider = stub_provider(StubNode {
            head: 1,
            logs: vec![lock_log(1, 0)],
            fail_get_logs: false,
        })
        .await;
        let watcher = BridgeWatcher::with_config(provider, BRIDGE, fast_config());

        let (tx, rx) = mpsc::channel(1);
        let handle = watcher.watch_lock(Some(1), tx).await.unwrap();
        drop(rx);

        tokio::time::timeout(WAIT, handle.join())
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_rpc_error_surfaces_from_join() {
        let provider = stub_provider(StubNode {
            head: 1,
            logs: Vec::new(),
            fail_get_logs: true,
        })
        .await;
        let watcher = BridgeWatcher::with_config(provider, BRIDGE, fast_config());

        let (tx, _rx) = mpsc::channel(1);
        let handle = watcher.watch_lock(Some(1), tx).await.unwrap();

        let err = tokio::time::timeout(WAIT, handle.join())
            .await
            .unwrap()
            .unwrap_err();
        assert!(err.to_string().contains("Failed to get logs from block 1 to 1"));
    }

    #[tokio::test]
    async fn test_filter_up_to_last_block_number() {
        let provider = stub_provider(StubNode {
            head: 1,
            logs: vec![lock_log(7, 0)],
            fail_get_logs: false,
        })
        .await;
        let watcher = BridgeWatcher::with_config(provider, BRIDGE, fast_config());

        let locks = tokio::time::timeout(WAIT, watcher.filter_lock(u64::MAX - 1, u64::MAX))
            .await
            .expect("range ending at u64::MAX terminates")
            .unwrap();
        assert_eq!(locks.len(), 1);
        assert_eq!(locks[0].amount_received, U256::from(7));
    }
}
