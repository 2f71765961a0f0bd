#[path = "../common/mod.rs"]
mod common;

use libbeep::test_support::SessionRecord;
use libbeep::transport::TransportEvent;
use libbeep::{Barcode, BarcodeType, DeviceState, Error};

use common::fixtures::{barcode_batch_events, coupon_barcode, loyalty_barcode};

#[test]
fn two_barcodes_out_of_order() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    session.request_barcodes()?;
    assert_eq!(session.state(), DeviceState::WaitingForBarcodes);

    mock.emit(TransportEvent::BarcodesBegin { count: 2 });
    mock.emit(TransportEvent::BarcodeSlot {
        index: 1,
        barcode: Barcode::from_wire("456", 36),
    });
    mock.emit(TransportEvent::BarcodeSlot {
        index: 0,
        barcode: Barcode::from_wire("123", 1),
    });
    mock.emit(TransportEvent::BarcodesComplete);

    assert_eq!(
        observer.records(),
        vec![
            SessionRecord::State(DeviceState::WaitingForBarcodes),
            SessionRecord::Barcodes(vec![
                Barcode::new("123", BarcodeType::Upca),
                Barcode::new("456", BarcodeType::QrCode),
            ]),
            SessionRecord::State(DeviceState::SessionOpened),
        ]
    );
    assert_eq!(session.state(), DeviceState::SessionOpened);
    Ok(())
}

#[test]
fn empty_batch_is_delivered() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    session.request_barcodes()?;
    for event in barcode_batch_events(&[], &[]) {
        mock.emit(event);
    }
    assert_eq!(observer.barcodes(), vec![Vec::<Barcode>::new()]);
    assert_eq!(session.state(), DeviceState::SessionOpened);
    Ok(())
}

#[test]
fn cancelled_batch_never_delivered() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    let barcodes = [loyalty_barcode(), coupon_barcode()];
    session.request_barcodes()?;

    let events = barcode_batch_events(&barcodes, &[0, 1]);
    mock.emit(events[0].clone());
    mock.emit(events[1].clone());
    session.cancel_barcodes()?;
    assert_eq!(session.state(), DeviceState::SessionOpened);

    // the rest of the old batch trickles in after the cancel
    for event in &events[2..] {
        mock.emit(event.clone());
    }
    assert!(observer.barcodes().is_empty());
    assert_eq!(
        observer.errors(),
        vec![Error::Cancelled {
            operation: "request_barcodes"
        }]
    );
    assert_eq!(session.state(), DeviceState::SessionOpened);
    Ok(())
}

#[test]
fn incomplete_batch_reports_error() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    let barcodes = [loyalty_barcode(), coupon_barcode()];
    session.request_barcodes()?;

    for event in barcode_batch_events(&barcodes, &[1]) {
        mock.emit(event);
    }
    assert!(observer.barcodes().is_empty());
    assert_eq!(
        observer.errors(),
        vec![Error::IncompleteBarcodeBatch {
            expected: 2,
            received: 1
        }]
    );
    assert_eq!(session.state(), DeviceState::SessionOpened);
    Ok(())
}

#[test]
fn slot_out_of_range_is_dropped() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    session.request_barcodes()?;
    mock.emit(TransportEvent::BarcodesBegin { count: 1 });
    mock.emit(TransportEvent::BarcodeSlot {
        index: 5,
        barcode: loyalty_barcode(),
    });
    mock.emit(TransportEvent::BarcodeSlot {
        index: 0,
        barcode: coupon_barcode(),
    });
    mock.emit(TransportEvent::BarcodesComplete);
    assert_eq!(observer.barcodes(), vec![vec![coupon_barcode()]]);
    Ok(())
}

#[test]
fn new_batch_replaces_unfinished_one() -> anyhow::Result<()> {
    let (session, mock, observer) = common::helpers::opened_session()?;
    session.request_barcodes()?;
    mock.emit(TransportEvent::BarcodesBegin { count: 3 });
    mock.emit(TransportEvent::BarcodeSlot {
        index: 2,
        barcode: coupon_barcode(),
    });
    for event in barcode_batch_events(&[loyalty_barcode()], &[0]) {
        mock.emit(event);
    }
    assert_eq!(observer.barcodes(), vec![vec![loyalty_barcode()]]);
    assert_eq!(session.state(), DeviceState::SessionOpened);
    Ok(())
}
