//! End-to-end request handling with in-memory classifiers.

use proptest::prelude::*;
use retail_predictor::models::inference::{align_to_columns, MISSING_FEATURE_FILL};
use retail_predictor::models::{Classifier, ModelRegistry, ModelSource};
use retail_predictor::{
    AppConfig, ChurnInput, FeatureExtractor, FeatureRecord, FeatureValue, HighSpendInput, Label,
    PredictError, PredictResult, PredictionContext, PredictionRequest, PredictionService, Reply,
};
use std::sync::{Arc, Mutex};

/// Classifier that remembers every row and answers from a closure
struct ScriptedClassifier {
    columns: Vec<String>,
    rows: Mutex<Vec<Vec<f32>>>,
    decide: fn(&[f32]) -> i64,
}

impl Classifier for ScriptedClassifier {
    fn name(&self) -> &str {
        "scripted"
    }

    fn feature_names(&self) -> &[String] {
        &self.columns
    }

    fn predict_row(&self, row: &[f32]) -> PredictResult<Label> {
        self.rows.lock().unwrap().push(row.to_vec());
        Label::try_from((self.decide)(row))
    }
}

struct ScriptedSource {
    high_spend: Arc<ScriptedClassifier>,
    churn: Arc<ScriptedClassifier>,
}

impl ModelSource for ScriptedSource {
    fn load(&self, context: PredictionContext) -> PredictResult<Arc<dyn Classifier>> {
        let model: Arc<dyn Classifier> = match context {
            PredictionContext::HighSpend => self.high_spend.clone(),
            PredictionContext::Churn => self.churn.clone(),
        };
        Ok(model)
    }
}

struct MissingSource;

impl ModelSource for MissingSource {
    fn load(&self, context: PredictionContext) -> PredictResult<Arc<dyn Classifier>> {
        Err(PredictError::ModelUnavailable {
            path: format!("models/{}.onnx", context),
            reason: "file not found".to_string(),
        })
    }
}

fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn scripted(names: &[&str], decide: fn(&[f32]) -> i64) -> Arc<ScriptedClassifier> {
    Arc::new(ScriptedClassifier {
        columns: columns(names),
        rows: Mutex::new(Vec::new()),
        decide,
    })
}

fn retiree_in_miami() -> ChurnInput {
    ChurnInput {
        recency: 400.0,
        frequency: 1,
        monetary: 75.0,
        customer_category: "Retiree".to_string(),
        city: "Miami".to_string(),
        store_type: "Pharmacy".to_string(),
        payment_method: "Cash".to_string(),
    }
}

#[test]
fn high_spend_scenario_reaches_model_in_its_column_order() {
    // deliberately not the builder's order
    let high_spend = scripted(
        &["Hour", "DayOfWeek", "Basket_Value", "Avg_Item_Price", "Basket_Size"],
        |row| (row[2] >= 50.0) as i64,
    );
    let churn = scripted(&["Recency"], |_| 0);
    let registry = ModelRegistry::new(ScriptedSource {
        high_spend: high_spend.clone(),
        churn,
    });
    let service = PredictionService::new(Arc::new(registry), FeatureExtractor::new());

    let response = service
        .predict_high_spend(&HighSpendInput::new(3, 20.0, "Wed", 14))
        .unwrap();

    assert_eq!(response.context, PredictionContext::HighSpend);
    assert_eq!(response.label, Label::Positive);
    assert_eq!(response.outcome, "High Spender");
    assert_eq!(
        high_spend.rows.lock().unwrap().as_slice(),
        &[vec![14.0_f32, 3.0, 60.0, 20.0, 3.0]]
    );
}

#[test]
fn churn_scenario_sends_encoded_categories() {
    let high_spend = scripted(&["Basket_Size"], |_| 0);
    let churn = scripted(
        &[
            "Recency",
            "Frequency",
            "Monetary",
            "Customer_Category",
            "City",
            "Store_Type",
            "Payment_Method",
        ],
        |row| (row[0] > 365.0) as i64,
    );
    let registry = ModelRegistry::new(ScriptedSource {
        high_spend,
        churn: churn.clone(),
    });
    let service = PredictionService::new(Arc::new(registry), FeatureExtractor::new());

    let response = service.predict_churn(&retiree_in_miami()).unwrap();

    assert_eq!(response.outcome, "Likely to Churn");
    assert_eq!(
        churn.rows.lock().unwrap().as_slice(),
        &[vec![400.0_f32, 1.0, 75.0, 4.0, 8.0, 2.0, 2.0]]
    );
}

#[test]
fn missing_artifact_is_fatal_and_reported() {
    let service = PredictionService::new(
        Arc::new(ModelRegistry::new(MissingSource)),
        FeatureExtractor::new(),
    );

    let request = PredictionRequest::Churn(retiree_in_miami());
    let err = service.handle(&request).unwrap_err();
    assert!(err.is_fatal());

    let reply = Reply::from_result(service.handle(&request));
    match reply {
        Reply::Error { kind, .. } => assert_eq!(kind, "model_unavailable"),
        Reply::Ok(_) => panic!("expected an error reply"),
    }
    assert!(service.registry().preload().is_err());
}

#[test]
fn json_request_to_reply() {
    let high_spend = scripted(&["Basket_Value"], |row| (row[0] > 1000.0) as i64);
    let churn = scripted(&["Recency"], |_| 0);
    let service = PredictionService::new(
        Arc::new(ModelRegistry::new(ScriptedSource { high_spend, churn })),
        FeatureExtractor::new(),
    );

    let request: PredictionRequest = serde_json::from_str(
        r#"{"context":"high_spend","basket_size":2,"avg_item_price":15,"day":"Sun","hour":9}"#,
    )
    .unwrap();
    let reply = serde_json::to_value(Reply::from_result(service.handle(&request))).unwrap();

    assert_eq!(reply["status"], "ok");
    assert_eq!(reply["label"], 0);
    assert_eq!(reply["outcome"], "Normal Spender");
}

#[test]
fn sample_config_parses() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/config.toml");
    let config = AppConfig::load_from_path(path).unwrap();

    assert_eq!(config.models.churn_file, "xgboost_churn.onnx");
    assert_eq!(config.service.workers, 4);
    assert!(!config.preprocessing.clip_churn_inputs);
}

proptest! {
    #[test]
    fn alignment_never_loses_a_required_column(
        present in proptest::collection::vec(any::<bool>(), 5),
        values in proptest::collection::vec(-1000.0f64..1000.0, 5),
    ) {
        let names = ["Basket_Size", "Avg_Item_Price", "DayOfWeek", "Hour", "Basket_Value"];
        let mut record = FeatureRecord::new();
        for i in 0..names.len() {
            if present[i] {
                record.insert(names[i], FeatureValue::Float(values[i]));
            }
        }
        record.insert("Unrelated", FeatureValue::Int(7));

        let expected = columns(&names);
        let row = align_to_columns(&record, &expected);

        prop_assert_eq!(row.values.len(), expected.len());
        prop_assert_eq!(row.dropped, columns(&["Unrelated"]));
        for i in 0..names.len() {
            if present[i] {
                prop_assert_eq!(row.values[i], values[i] as f32);
            } else {
                prop_assert_eq!(row.values[i], MISSING_FEATURE_FILL);
                prop_assert!(row.filled.contains(&expected[i]));
            }
        }
    }
}
