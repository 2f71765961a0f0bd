// libbeep/src/console.rs

//! Line-oriented command parser for interactive point-of-sale consoles.
//!
//! Command names are case-insensitive and accept both `open_session` and
//! `opensession` spellings. Arguments are separated by whitespace.

use thiserror::Error;

use crate::types::{MfcBlockData, MfcKey, MfcKeyType, PaymentMetadata};
use crate::utils::parse_hex;

/// One parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Start device detection.
    Start,
    /// Stop the session.
    Stop,
    /// Open a session.
    OpenSession,
    /// Close the session.
    CloseSession,
    /// Request barcodes.
    RequestBarcodes,
    /// Cancel the barcode request.
    CancelBarcodes,
    /// Request a payment token for a charge.
    CreatePaymentToken {
        /// Amount in coins.
        amount_in_coins: u64,
        /// Merchant transaction id.
        transaction_id: String,
        /// Cashier, empty when omitted.
        cashier_id: String,
        /// Split payment metadata.
        metadata: PaymentMetadata,
    },
    /// Cancel the payment in flight.
    CancelPayment,
    /// Refund a simple payment by backend transaction id.
    Refund(u64),
    /// Refund a partial payment by payment request uid.
    RefundPartial(String),
    /// Ask the backend where a payment stands.
    PaymentStatus {
        /// Merchant transaction id.
        transaction_id: String,
        /// Amount the payment was made for.
        amount_in_coins: u64,
    },
    /// Enable the NFC reader.
    EnableNfc,
    /// Disable the NFC reader.
    DisableNfc,
    /// Read a Mifare Classic block.
    ReadMfcBlock {
        /// Block to read.
        block_no: u8,
        /// Sector key.
        key: MfcKey,
    },
    /// Write a Mifare Classic block.
    WriteMfcBlock {
        /// Block number and content.
        data: MfcBlockData,
        /// Sector key.
        key: MfcKey,
    },
    /// Leave the console.
    Exit,
}

/// Why a line could not be parsed. The message includes the usage line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsoleError {
    /// The first word is not a command.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Wrong number of arguments.
    #[error("invalid parameter count for {command}\nusage: {usage}")]
    Usage {
        /// Command name.
        command: &'static str,
        /// Usage line.
        usage: &'static str,
    },

    /// An argument did not parse.
    #[error("invalid argument for {command}: {reason}\nusage: {usage}")]
    InvalidArgument {
        /// Command name.
        command: &'static str,
        /// What was wrong with the argument.
        reason: String,
        /// Usage line.
        usage: &'static str,
    },
}

struct Syntax {
    name: &'static str,
    usage: &'static str,
}

impl Syntax {
    fn arity(&self, args: &[&str], min: usize, max: usize) -> Result<(), ConsoleError> {
        if args.len() < min || args.len() > max {
            return Err(ConsoleError::Usage {
                command: self.name,
                usage: self.usage,
            });
        }
        Ok(())
    }

    fn invalid(&self, reason: impl ToString) -> ConsoleError {
        ConsoleError::InvalidArgument {
            command: self.name,
            reason: reason.to_string(),
            usage: self.usage,
        }
    }
}

const CREATE_PAYMENT_TOKEN: Syntax = Syntax {
    name: "create_payment_token",
    usage: "create_payment_token <amount> <txId> [cashierId] [key:val;key:val]",
};
const REFUND: Syntax = Syntax {
    name: "refund",
    usage: "refund <backendTransactionId>",
};
const REFUND_PARTIAL: Syntax = Syntax {
    name: "refund_partial",
    usage: "refund_partial <paymentRequestUid>",
};
const PAYMENT_STATUS: Syntax = Syntax {
    name: "payment_status",
    usage: "payment_status <txId> <amount>",
};
const READ_BLOCK: Syntax = Syntax {
    name: "nfc_read_mfc_block",
    usage: "nfc_read_mfc_block <blockNo> <A|B> <hexKey>",
};
const WRITE_BLOCK: Syntax = Syntax {
    name: "nfc_write_mfc_block",
    usage: "nfc_write_mfc_block <blockNo> <A|B> <hexKey> <hexData>",
};

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<ConsoleCommand>, ConsoleError> {
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();
    let key = name.to_ascii_lowercase().replace('_', "");

    let simple = |command: ConsoleCommand, command_name: &'static str| {
        if args.is_empty() {
            Ok(Some(command))
        } else {
            Err(ConsoleError::Usage {
                command: command_name,
                usage: command_name,
            })
        }
    };

    match key.as_str() {
        "start" => simple(ConsoleCommand::Start, "start"),
        "stop" => simple(ConsoleCommand::Stop, "stop"),
        "opensession" => simple(ConsoleCommand::OpenSession, "open_session"),
        "closesession" => simple(ConsoleCommand::CloseSession, "close_session"),
        "requestbarcodes" => simple(ConsoleCommand::RequestBarcodes, "request_barcodes"),
        "cancelbarcodes" => simple(ConsoleCommand::CancelBarcodes, "cancel_barcodes"),
        "cancelpayment" => simple(ConsoleCommand::CancelPayment, "cancel_payment"),
        "enablenfc" => simple(ConsoleCommand::EnableNfc, "enable_nfc"),
        "disablenfc" => simple(ConsoleCommand::DisableNfc, "disable_nfc"),
        "exit" | "quit" => simple(ConsoleCommand::Exit, "exit"),
        "createpaymenttoken" => parse_payment_token(&args).map(Some),
        "refund" => {
            REFUND.arity(&args, 1, 1)?;
            let id = args[0]
                .parse::<u64>()
                .map_err(|_| REFUND.invalid("backend transaction id must be an integer"))?;
            Ok(Some(ConsoleCommand::Refund(id)))
        }
        "refundpartial" => {
            REFUND_PARTIAL.arity(&args, 1, 1)?;
            Ok(Some(ConsoleCommand::RefundPartial(args[0].to_string())))
        }
        "paymentstatus" => {
            PAYMENT_STATUS.arity(&args, 2, 2)?;
            let amount_in_coins = args[1]
                .parse::<u64>()
                .map_err(|_| PAYMENT_STATUS.invalid("unable to parse amount"))?;
            Ok(Some(ConsoleCommand::PaymentStatus {
                transaction_id: args[0].to_string(),
                amount_in_coins,
            }))
        }
        "nfcreadmfcblock" => {
            READ_BLOCK.arity(&args, 3, 3)?;
            let block_no = parse_block_no(&READ_BLOCK, args[0])?;
            let key = parse_key(&READ_BLOCK, args[1], args[2])?;
            Ok(Some(ConsoleCommand::ReadMfcBlock { block_no, key }))
        }
        "nfcwritemfcblock" => {
            WRITE_BLOCK.arity(&args, 4, 4)?;
            let block_no = parse_block_no(&WRITE_BLOCK, args[0])?;
            let key = parse_key(&WRITE_BLOCK, args[1], args[2])?;
            let bytes = parse_hex(args[3]).map_err(|e| WRITE_BLOCK.invalid(e))?;
            let data = MfcBlockData::new(i32::from(block_no), &bytes)
                .map_err(|e| WRITE_BLOCK.invalid(e))?;
            Ok(Some(ConsoleCommand::WriteMfcBlock { data, key }))
        }
        _ => Err(ConsoleError::UnknownCommand(name.to_string())),
    }
}

fn parse_payment_token(args: &[&str]) -> Result<ConsoleCommand, ConsoleError> {
    let syntax = &CREATE_PAYMENT_TOKEN;
    syntax.arity(args, 2, 4)?;
    let amount_in_coins = args[0]
        .parse::<u64>()
        .map_err(|_| syntax.invalid("unable to parse amount"))?;
    let transaction_id = args[1].to_string();
    let cashier_id = args.get(2).map(|s| s.to_string()).unwrap_or_default();
    let metadata = match args.get(3) {
        Some(raw) => parse_metadata(raw).map_err(|e| syntax.invalid(e))?,
        None => PaymentMetadata::new(),
    };
    Ok(ConsoleCommand::CreatePaymentToken {
        amount_in_coins,
        transaction_id,
        cashier_id,
        metadata,
    })
}

/// `key1:value1;key2:value2`. A trailing `;` is tolerated.
pub fn parse_metadata(raw: &str) -> Result<PaymentMetadata, String> {
    let mut metadata = PaymentMetadata::new();
    for pair in raw.split(';').filter(|p| !p.is_empty()) {
        match pair.split(':').collect::<Vec<_>>().as_slice() {
            [k, v] if !k.is_empty() => {
                metadata.insert(k.to_string(), v.to_string());
            }
            _ => return Err(format!("invalid metadata entry `{}`, expected key:value", pair)),
        }
    }
    Ok(metadata)
}

fn parse_block_no(syntax: &Syntax, raw: &str) -> Result<u8, ConsoleError> {
    raw.parse::<u8>()
        .map_err(|_| syntax.invalid(format!("block number `{}` must be in 0..256", raw)))
}

fn parse_key(syntax: &Syntax, key_type: &str, hex_key: &str) -> Result<MfcKey, ConsoleError> {
    let key_type = match key_type {
        "A" | "a" => MfcKeyType::KeyA,
        "B" | "b" => MfcKeyType::KeyB,
        other => return Err(syntax.invalid(format!("key type `{}` must be A or B", other))),
    };
    let bytes = parse_hex(hex_key).map_err(|e| syntax.invalid(e))?;
    MfcKey::new(key_type, &bytes).map_err(|e| syntax.invalid(e))
}
