// Interactive point-of-sale console against a simulated device
//
// Reads commands from stdin (see `libbeep::console`), drives a session on a
// mock transport and plays the device's part after every command: a loyalty
// barcode batch, payment tokens from the phone, a Mifare card in the field.
// Payments go to a mock backend that approves everything.
//
// Run with `RUST_LOG=libbeep=debug cargo run --example pos_console`.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use libbeep::console::{ConsoleCommand, parse_line};
use libbeep::payment::BackendResponse;
use libbeep::prelude::*;
use libbeep::transport::mock::{DeviceCall, MifareCall, MockDeviceTransport, MockPaymentTransport};
use libbeep::transport::{MfcCompletion, MockMifareTransport};

const DEVICE_ID: u64 = 4711;

/// Prints session callbacks. Keeps the token waiting to be paid and the
/// amount of the last one, which refunds reuse.
#[derive(Default)]
struct Printer {
    fresh_token: Mutex<Option<PaymentToken>>,
    last_amount: Mutex<u64>,
}

impl SessionObserver for Printer {
    fn on_state_changed(&self, state: DeviceState) {
        println!("< state: {}", state);
    }

    fn on_barcodes(&self, barcodes: Vec<Barcode>) {
        for b in barcodes {
            println!("< barcode: {} ({:?})", b.value, b.barcode_type);
        }
    }

    fn on_payment_token(&self, token: PaymentToken) {
        println!(
            "< payment token for {}: {}",
            token.charge.transaction_id, token.token
        );
        *self.last_amount.lock() = token.charge.amount_in_coins;
        *self.fresh_token.lock() = Some(token);
    }

    fn on_mobile_connection_changed(&self, connected: bool) {
        println!("< mobile connected: {}", connected);
    }

    fn on_nfc_event(&self, event: DetectionEvent) {
        println!("< nfc: {:?}", event);
    }

    fn on_error(&self, error: Error) {
        println!("< error: {}", error);
    }
}

struct PaymentPrinter;

impl PaymentObserver for PaymentPrinter {
    fn on_payment_result(&self, transaction_id: &str, result: &PaymentResult) {
        println!("< payment {}: {:?}", transaction_id, result);
    }

    fn on_refund_result(&self, target: &RefundTarget, result: &RefundResult) {
        println!("< refund {:?}: {:?}", target, result);
    }

    fn on_status_result(&self, transaction_id: &str, result: &StatusResult) {
        println!("< status of {}: {:?}", transaction_id, result);
    }
}

struct MifarePrinter;

impl MifareObserver for MifarePrinter {
    fn on_read_result(&self, block_no: u8, result: libbeep::nfc::MfcReadResult) {
        match result {
            Ok(block) => println!("< block {}: {} |{}|", block_no, block.to_hex(), block.to_ascii_safe()),
            Err(e) => println!("< block {} read failed: {}", block_no, e),
        }
    }

    fn on_write_result(&self, block_no: u8, result: libbeep::nfc::MfcWriteResult) {
        match result {
            Ok(()) => println!("< block {} written", block_no),
            Err(e) => println!("< block {} write failed: {}", block_no, e),
        }
    }
}

/// Plays the device after the command that produced `call`.
fn simulate_device(device: &MockDeviceTransport, call: Option<DeviceCall>) {
    match call {
        Some(DeviceCall::Detect) => {
            device.detect_device("1.4.2", DEVICE_ID);
            device.emit(TransportEvent::MobileConnectionChanged(true));
        }
        Some(DeviceCall::RequestBarcodes) => {
            device.emit(TransportEvent::BarcodesBegin { count: 2 });
            device.emit(TransportEvent::BarcodeSlot {
                index: 1,
                barcode: Barcode::from_wire("https://beep.example/c/42", 36),
            });
            device.emit(TransportEvent::BarcodeSlot {
                index: 0,
                barcode: Barcode::from_wire("036000291452", 1),
            });
            device.emit(TransportEvent::BarcodesComplete);
        }
        Some(DeviceCall::SendPaymentTokenRequest(charge)) => {
            device.emit(TransportEvent::PaymentTokenReceived(format!(
                "tok-{}",
                charge.transaction_id
            )));
        }
        Some(DeviceCall::SetNfcEnabled(true)) => {
            device.emit(TransportEvent::NfcDetection(DetectionEvent::Detected {
                card_info: CardInfo::new(CardType::MifareClassic1k, "04a2197f"),
            }));
        }
        _ => {}
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let device = MockDeviceTransport::new();
    let printer = Arc::new(Printer::default());
    let session = DeviceSessionBuilder::new()
        .with_transport(Box::new(device.clone()))
        .with_observer(printer.clone())
        .build()?;

    let backend = MockPaymentTransport::new();
    let payments = PaymentClient::new(
        Box::new(backend.clone()),
        PaymentConfig::new(Environment::Development, "demo-merchant"),
    )?;
    payments.set_observer(Arc::new(PaymentPrinter));
    let mut next_backend_id = 1000u64;

    let reader = MockMifareTransport::new();
    let mut channel: Option<MifareClassicChannel> = None;
    let mut answered = 0usize;

    println!("type commands, `exit` to quit");
    let stdin = io::stdin();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }

        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        device.clear_calls();
        let result = match command {
            ConsoleCommand::Start => session.start(),
            ConsoleCommand::Stop => session.stop(),
            ConsoleCommand::OpenSession => session.open_session(),
            ConsoleCommand::CloseSession => session.close_session(),
            ConsoleCommand::RequestBarcodes => session.request_barcodes(),
            ConsoleCommand::CancelBarcodes => session.cancel_barcodes(),
            ConsoleCommand::CreatePaymentToken {
                amount_in_coins,
                transaction_id,
                cashier_id,
                metadata,
            } => session.create_payment_token(amount_in_coins, &transaction_id, &cashier_id, metadata),
            ConsoleCommand::CancelPayment => session.cancel_payment(),
            ConsoleCommand::Refund(id) => refund(&payments, &printer, RefundTarget::BackendTransaction(id)),
            ConsoleCommand::RefundPartial(uid) => {
                refund(&payments, &printer, RefundTarget::PaymentRequestUid(uid))
            }
            ConsoleCommand::PaymentStatus {
                transaction_id,
                amount_in_coins,
            } => payments.payment_status(&StatusQuery::new(transaction_id, amount_in_coins, DEVICE_ID)),
            ConsoleCommand::EnableNfc => session.enable_nfc(),
            ConsoleCommand::DisableNfc => session.disable_nfc(),
            ConsoleCommand::ReadMfcBlock { block_no, key } => {
                with_channel(&session, &reader, &mut channel, |c| c.read_block(block_no, &key))
            }
            ConsoleCommand::WriteMfcBlock { data, key } => {
                with_channel(&session, &reader, &mut channel, |c| c.write_block(&data, &key))
            }
            ConsoleCommand::Exit => break,
        };

        if let Err(e) = result {
            println!("! {}", e);
            continue;
        }

        simulate_device(&device, device.last_call());

        // pay every fresh token right away
        let token = printer.fresh_token.lock().take();
        if let Some(token) = token {
            payments.pay(&PaymentRequest::from_token(&token, DEVICE_ID))?;
        }
        while backend.pending() > 0 {
            backend.respond(
                BackendResponse::ok(next_backend_id)
                    .with_payment_request_uid(format!("uid-{}", next_backend_id))
                    .with_status(PaymentStatus::Accepted),
            );
            next_backend_id += 1;
        }

        // the reader answers at once: reads return the block number
        // repeated, writes succeed
        let calls = reader.calls();
        for call in &calls[answered..] {
            let completion = match call {
                MifareCall::Read { block_no, .. } => MfcCompletion::Read {
                    data: vec![*block_no; 16],
                },
                MifareCall::Write { .. } => MfcCompletion::Written,
            };
            reader.complete(completion);
        }
        answered = calls.len();
    }

    session.shutdown();
    Ok(())
}

/// Refunds reuse the amount of the last token the console saw.
fn refund(payments: &PaymentClient, printer: &Printer, target: RefundTarget) -> Result<()> {
    let amount = *printer.last_amount.lock();
    payments.refund(&RefundRequest::new(target, amount, DEVICE_ID))
}

fn with_channel(
    session: &DeviceSession,
    reader: &MockMifareTransport,
    channel: &mut Option<MifareClassicChannel>,
    op: impl FnOnce(&MifareClassicChannel) -> Result<()>,
) -> Result<()> {
    if channel.is_none() {
        let opened = session.mifare_channel(Box::new(reader.clone()))?;
        opened.set_observer(Arc::new(MifarePrinter));
        *channel = Some(opened);
    }
    match channel.as_ref() {
        Some(c) => op(c),
        None => Ok(()),
    }
}
