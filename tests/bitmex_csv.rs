use anyhow::Result;
use ledger_ingest::domain::{
    Asset, HistoryEventSubType, HistoryEventType, MovementCategory,
};
use ledger_ingest::infrastructure::{FixedPriceOracle, MemorySink, MessageAggregator};
use ledger_ingest::services::BitmexImporter;
use ledger_ingest::{CsvImport, ImportError};
use rust_decimal_macros::dec;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::info;

const WALLET_HISTORY: &str = r#"transactTime,transactType,amount,fee,address,tx,transactStatus,walletBalance
"08/04/2020, 10:18:46 AM",Deposit,100000000,,3BMEXabcDEFghiJKLmnoPQRstuVWXyz,c5a2d7f3e1,Completed,100000000
"08/05/2020, 09:00:00 PM",RealisedPNL,500000000,92,XBTUSD,,Completed,600000092
"08/06/2020, 01:05:12 AM",RealisedPNL,-500000000,0,ETHUSD,,Completed,100000092
"08/07/2020, 11:30:00 AM",Withdrawal,-50000000,300000,3BMEXotherDEFghiJKLmnoPQRstuVWX,e1f2a3b4c5,Completed,49700092
"#;

fn btc_oracle() -> FixedPriceOracle {
    FixedPriceOracle::new().with_price(Asset::BTC, Asset::USD, dec!(11543.33))
}

#[test]
fn imports_wallet_history_end_to_end() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    info!("Importing a wallet-history export with all three transact types");

    let oracle = btc_oracle();
    let mut sink = MemorySink::new();
    let mut messages = MessageAggregator::new();
    let mut importer = BitmexImporter::new(&mut sink, &oracle, &mut messages);
    importer.import_str(WALLET_HISTORY)?;

    assert!(messages.warnings().is_empty());
    assert_eq!(sink.movements().len(), 2);
    assert_eq!(sink.margin_positions().len(), 2);
    assert_eq!(sink.history_events().len(), 2);

    let deposit = &sink.movements()[0];
    assert_eq!(deposit.category, MovementCategory::Deposit);
    assert_eq!(deposit.timestamp, 1596536326);
    assert_eq!(deposit.asset, Asset::BTC);
    assert_eq!(deposit.amount, dec!(1));
    assert_eq!(deposit.fee, dec!(0));
    assert_eq!(deposit.fee_asset, Asset::BTC);
    assert_eq!(
        deposit.address.as_deref(),
        Some("3BMEXabcDEFghiJKLmnoPQRstuVWXyz")
    );
    assert_eq!(deposit.transaction_id.as_deref(), Some("c5a2d7f3e1"));
    assert_eq!(
        deposit.link,
        "Imported from BitMEX CSV file. Transact Type: Deposit"
    );

    let withdrawal = &sink.movements()[1];
    assert_eq!(withdrawal.category, MovementCategory::Withdrawal);
    assert_eq!(withdrawal.timestamp, 1596799800);
    // The export reports withdrawals negative; direction lives in the
    // category, so the amount comes out as a positive magnitude.
    assert_eq!(withdrawal.amount, dec!(0.5));
    assert_eq!(withdrawal.fee, dec!(0.003));
    assert_eq!(
        withdrawal.link,
        "Imported from BitMEX CSV file. Transact Type: Withdrawal"
    );

    let gain = &sink.margin_positions()[0];
    assert_eq!(gain.open_time, None);
    assert_eq!(gain.close_time, 1596661200);
    assert_eq!(gain.profit_loss, dec!(5));
    assert_eq!(gain.pl_currency, Asset::BTC);
    assert_eq!(gain.fee, dec!(0.00000092));
    assert_eq!(gain.fee_currency, Asset::BTC);
    assert_eq!(gain.notes, "PnL from trade on XBTUSD");
    assert_eq!(
        gain.link,
        "Imported from BitMEX CSV file. Transact Type: RealisedPNL"
    );

    let loss = &sink.margin_positions()[1];
    assert_eq!(loss.profit_loss, dec!(-5));
    assert_eq!(loss.notes, "PnL from trade on ETHUSD");

    info!("Checking the realized-PnL history events");
    let gain_event = &sink.history_events()[0];
    assert!(gain_event.event_identifier.starts_with("BMEX_"));
    assert_eq!(gain_event.sequence_index, 0);
    assert_eq!(gain_event.timestamp, 1596661200000);
    assert_eq!(gain_event.asset, Asset::BTC);
    assert_eq!(gain_event.event_type, HistoryEventType::Margin);
    assert_eq!(gain_event.event_subtype, HistoryEventSubType::Receive);
    assert_eq!(gain_event.balance.amount, dec!(5));
    assert_eq!(gain_event.balance.usd_value, dec!(57716.65));

    let loss_event = &sink.history_events()[1];
    assert_eq!(loss_event.event_subtype, HistoryEventSubType::Spend);
    assert_eq!(loss_event.balance.amount, dec!(5));
    assert_eq!(loss_event.balance.usd_value, dec!(57716.65));
    assert_ne!(gain_event.event_identifier, loss_event.event_identifier);

    Ok(())
}

#[test]
fn reimporting_the_same_file_is_idempotent() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    let oracle = btc_oracle();
    let mut sink = MemorySink::new();
    let mut messages = MessageAggregator::new();

    {
        let mut importer = BitmexImporter::new(&mut sink, &oracle, &mut messages);
        importer.import_str(WALLET_HISTORY)?;
    }
    let first_run: Vec<String> = sink
        .history_events()
        .iter()
        .map(|event| event.event_identifier.clone())
        .collect();
    assert_eq!(sink.record_count(), 6);

    {
        let mut importer = BitmexImporter::new(&mut sink, &oracle, &mut messages);
        importer.import_str(WALLET_HISTORY)?;
    }
    let second_run: Vec<String> = sink
        .history_events()
        .iter()
        .map(|event| event.event_identifier.clone())
        .collect();

    info!("Second import added {} records", sink.record_count() - 6);
    assert_eq!(sink.record_count(), 6);
    assert_eq!(first_run, second_run);

    Ok(())
}

#[test]
fn unrecognized_transact_types_warn_and_continue() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    let raw = r#"transactTime,transactType,amount,fee,address,tx,transactStatus,walletBalance
"08/04/2020, 10:18:46 AM",Deposit,100000000,,addr1,tx1,Completed,100000000
"08/04/2020, 11:00:00 AM",AffiliatePayout,5000,,addr2,tx2,Completed,100005000
"08/04/2020, 11:30:00 AM",Withdrawal,-50000000,300000,addr3,tx3,Completed,49705000
"#;

    let oracle = btc_oracle();
    let mut sink = MemorySink::new();
    let mut messages = MessageAggregator::new();
    let mut importer = BitmexImporter::new(&mut sink, &oracle, &mut messages);
    importer.import_str(raw)?;

    assert_eq!(sink.movements().len(), 2);
    assert_eq!(sink.movements()[0].category, MovementCategory::Deposit);
    assert_eq!(sink.movements()[1].category, MovementCategory::Withdrawal);

    assert_eq!(messages.warnings().len(), 1);
    let warning = &messages.warnings()[0];
    info!("Warning: {warning}");
    assert!(warning.contains("transactType AffiliatePayout is not currently supported"));
    assert!(warning.ends_with("Ignoring entry"));

    Ok(())
}

#[test]
fn one_malformed_row_in_ten_skips_exactly_one() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    let mut raw = String::from(
        "transactTime,transactType,amount,fee,address,tx,transactStatus,walletBalance\n",
    );
    for i in 1..=10 {
        let amount = if i == 5 {
            "notanumber".to_string()
        } else {
            format!("{}", i * 100000000)
        };
        raw.push_str(&format!(
            "\"08/04/2020, 10:18:46 AM\",Deposit,{amount},,addr{i},tx{i},Completed,0\n"
        ));
    }

    let oracle = btc_oracle();
    let mut sink = MemorySink::new();
    let mut messages = MessageAggregator::new();
    let mut importer = BitmexImporter::new(&mut sink, &oracle, &mut messages);
    let result = importer.import_str(&raw);

    assert!(result.is_ok());
    assert_eq!(sink.record_count(), 9);
    assert_eq!(messages.warnings().len(), 1);
    let warning = &messages.warnings()[0];
    assert!(warning.starts_with("Deserialization error during BitMEX CSV import."));
    assert!(warning.ends_with("Ignoring entry"));

    Ok(())
}

#[test]
fn missing_required_column_aborts_with_nothing_persisted() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    let raw = "transactType,amount,fee,address,tx\n\
               Deposit,100000000,,addr1,tx1\n\
               Withdrawal,-50000000,300000,addr2,tx2\n";

    let oracle = btc_oracle();
    let mut sink = MemorySink::new();
    let mut messages = MessageAggregator::new();
    let mut importer = BitmexImporter::new(&mut sink, &oracle, &mut messages);
    let result = importer.import_str(raw);

    let err = result.unwrap_err();
    assert!(matches!(
        &err,
        ImportError::MissingKey { key, .. } if key == "transactTime"
    ));
    assert!(err.to_string().contains("transactTime"));
    assert_eq!(sink.record_count(), 0);
}

#[test]
fn batched_events_survive_a_mid_file_abort() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    // A ragged second row kills the import, but the PnL already parsed from
    // the first row must still reach the sink.
    let raw = r#"transactTime,transactType,amount,fee,address,tx,transactStatus,walletBalance
"08/05/2020, 09:00:00 PM",RealisedPNL,500000000,92,XBTUSD,,Completed,600000092
garbage,Deposit
"#;

    let oracle = btc_oracle();
    let mut sink = MemorySink::new();
    let mut messages = MessageAggregator::new();
    let mut importer = BitmexImporter::new(&mut sink, &oracle, &mut messages);
    let result = importer.import_str(raw);

    assert!(matches!(result, Err(ImportError::Csv(_))));
    assert_eq!(sink.margin_positions().len(), 1);
    assert_eq!(sink.history_events().len(), 1);
    assert_eq!(sink.history_events()[0].balance.amount, dec!(5));

    Ok(())
}

#[test]
fn byte_order_marks_are_tolerated() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    let raw = format!("\u{feff}{WALLET_HISTORY}");

    let oracle = btc_oracle();
    let mut sink = MemorySink::new();
    let mut messages = MessageAggregator::new();
    let mut importer = BitmexImporter::new(&mut sink, &oracle, &mut messages);
    importer.import_str(&raw)?;

    assert_eq!(sink.record_count(), 6);
    assert!(messages.warnings().is_empty());

    Ok(())
}

#[test]
fn imports_from_a_file_on_disk() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    // Real exports arrive as BOM-prefixed files, so exercise the path-based
    // entry point with one.
    let mut file = NamedTempFile::new()?;
    write!(file, "\u{feff}{WALLET_HISTORY}")?;

    let oracle = btc_oracle();
    let mut sink = MemorySink::new();
    let mut messages = MessageAggregator::new();
    let mut importer = BitmexImporter::new(&mut sink, &oracle, &mut messages);
    importer.import_file(file.path())?;

    assert_eq!(sink.record_count(), 6);
    assert!(messages.warnings().is_empty());

    Ok(())
}

#[test]
fn imports_from_any_reader() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    let oracle = btc_oracle();
    let mut sink = MemorySink::new();
    let mut messages = MessageAggregator::new();
    let mut importer = BitmexImporter::new(&mut sink, &oracle, &mut messages);
    importer.import_reader(WALLET_HISTORY.as_bytes())?;

    assert_eq!(sink.record_count(), 6);
    assert!(messages.warnings().is_empty());

    Ok(())
}

#[test]
fn a_missing_price_skips_the_pnl_row_only() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    // No BTC/USD price configured: the PnL row cannot be valued, but the
    // movements around it import fine.
    let oracle = FixedPriceOracle::new();
    let mut sink = MemorySink::new();
    let mut messages = MessageAggregator::new();
    let mut importer = BitmexImporter::new(&mut sink, &oracle, &mut messages);
    importer.import_str(WALLET_HISTORY)?;

    assert_eq!(sink.movements().len(), 2);
    assert_eq!(sink.margin_positions().len(), 0);
    assert_eq!(sink.history_events().len(), 0);
    assert_eq!(messages.warnings().len(), 2);
    assert!(messages.warnings()[0].contains("no historical USD price for BTC"));

    Ok(())
}
