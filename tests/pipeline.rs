use std::fs::{self, File};
use std::path::Path;

use olist_insights::charts::ChartKind;
use olist_insights::data::DatasetKind;
use olist_insights::{run, PipelineConfig, PipelineError};

fn write_csv(dir: &Path, kind: DatasetKind, content: &str) {
    fs::write(dir.join(kind.file_name()), content).unwrap();
}

fn sample_archive(dir: &Path) {
    write_csv(
        dir,
        DatasetKind::Orders,
        "order_id,customer_id,order_status,order_purchase_timestamp,order_delivered_customer_date,order_estimated_delivery_date\n\
         o1,c1,delivered,2021-01-10 09:30:00,2021-01-25 10:00:00,2021-01-20 00:00:00\n\
         o2,c2,delivered,2021-02-03 14:00:00,2021-02-10 08:00:00,2021-02-15 00:00:00\n\
         o3,c1,delivered,2021-03-12 11:15:00,2021-03-20 12:00:00,2021-03-22 00:00:00\n",
    );
    write_csv(
        dir,
        DatasetKind::Payments,
        "order_id,payment_sequential,payment_type,payment_installments,payment_value\n\
         o1,1,credit_card,1,100.00\n\
         o2,1,credit_card,2,50.00\n\
         o2,2,voucher,1,25.00\n\
         o3,1,boleto,1,40.00\n",
    );
    write_csv(
        dir,
        DatasetKind::Customers,
        "customer_id,customer_unique_id,customer_zip_code_prefix,customer_city,customer_state\n\
         c1,u1,01310,sao paulo,SP\n\
         c2,u2,20000,rio de janeiro,RJ\n",
    );
    write_csv(
        dir,
        DatasetKind::Geolocation,
        "geolocation_zip_code_prefix,geolocation_lat,geolocation_lng,geolocation_city,geolocation_state\n\
         01310,-23.5,-46.6,sao paulo,SP\n\
         01310,-23.5,-46.6,sao paulo,SP\n\
         01310,-22.9,-43.2,rio de janeiro,RJ\n\
         20000,-22.9,-43.2,rio de janeiro,RJ\n",
    );
    write_csv(
        dir,
        DatasetKind::Reviews,
        "review_id,order_id,review_score\n\
         r1,o1,2\n\
         r2,o2,5\n\
         r3,o3,abc\n",
    );
}

fn config(root: &Path) -> PipelineConfig {
    PipelineConfig {
        base_path: root.join("archive"),
        output_dir: root.join("charts"),
        output_name: root.join("deck").join("Olist_Consulting_Deck.pptx"),
    }
}

#[test]
fn full_run_writes_metrics_and_deck() {
    let root = tempfile::tempdir().unwrap();
    fs::create_dir_all(root.path().join("archive")).unwrap();
    sample_archive(&root.path().join("archive"));
    let config = config(root.path());

    let summary = run(&config).unwrap();

    // Items and products are absent.
    let skipped: Vec<&str> = summary.skipped.iter().map(|s| s.step).collect();
    assert_eq!(skipped, vec!["category_contribution"]);

    let metrics: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&summary.metrics_path).unwrap()).unwrap();
    let revenue: Vec<f64> = metrics["revenue_trend"]["points"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["revenue"].as_f64().unwrap())
        .collect();
    assert_eq!(revenue, vec![100.0, 75.0, 40.0]);
    assert_eq!(metrics["revenue_by_state"][0]["state"], "SP");
    assert_eq!(metrics["revenue_by_state"][0]["revenue"], 140.0);
    assert_eq!(
        metrics["delivery_vs_reviews"]["observations"]
            .as_array()
            .unwrap()
            .len(),
        2
    );
    assert!(metrics["category_contribution"].is_null());

    // Every chart but the category one has data behind it and must be drawn.
    let kinds: Vec<ChartKind> = summary.charts.iter().map(|c| c.kind).collect();
    let expected: Vec<ChartKind> = ChartKind::ALL
        .into_iter()
        .filter(|k| *k != ChartKind::TopCategories)
        .collect();
    assert_eq!(kinds, expected);
    for chart in &summary.charts {
        assert!(chart.path.starts_with(&config.output_dir));
        let (width, height) = image::image_dimensions(&chart.path).unwrap();
        assert!(width > 0 && height > 0, "{} is empty", chart.path.display());
    }
    assert!(!config.output_dir.join(ChartKind::TopCategories.file_name()).exists());

    // Eight text slides plus the eight chart slides.
    let mut deck = zip::ZipArchive::new(File::open(&summary.deck_path).unwrap()).unwrap();
    let slide_parts = deck
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide"))
        .count();
    assert_eq!(slide_parts, 16);
    assert!(deck.by_name("ppt/presentation.xml").is_ok());
}

#[test]
fn missing_orders_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    let archive = root.path().join("archive");
    fs::create_dir_all(&archive).unwrap();
    write_csv(
        &archive,
        DatasetKind::Payments,
        "order_id,payment_type,payment_value\no1,credit_card,10\n",
    );
    let config = config(root.path());

    let err = run(&config).unwrap_err();

    assert!(matches!(err, PipelineError::Fact(_)));
    assert!(!config.output_name.exists());
}
