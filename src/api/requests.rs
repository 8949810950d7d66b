// Request body types
// Each endpoint decodes its body into one of these, then validates it into
// the typed arguments the face analysis service takes.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use crate::face::{
    AnalyzeArgs, RepresentArgs, VerifyArgs, DEFAULT_ACTIONS, DEFAULT_DETECTOR_BACKEND,
    DEFAULT_DISTANCE_METRIC, DEFAULT_MODEL_NAME,
};

/// A required input is absent. Reported to the caller as a 200
/// `{"message": ...}` body, never as an HTTP error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MissingInput {
    #[error("empty input set passed")]
    EmptyBody,
    #[error("you must pass img_path input")]
    Image,
    #[error("you must pass img1_path input")]
    FirstImage,
    #[error("you must pass img2_path input")]
    SecondImage,
    #[error("you must pass embedding1 input")]
    FirstEmbedding,
    #[error("you must pass embedding2 input")]
    SecondEmbedding,
}

/// Decode a request body. `Ok(None)` for an absent body: no bytes,
/// only whitespace, or a bare JSON `null`.
pub fn decode_body<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<Option<T>>(body)
}

/// The primary key wins when it holds a non-empty string, otherwise the
/// `_path` alias is used.
fn pick_image(primary: Option<String>, alias: Option<String>) -> Option<String> {
    primary.filter(|s| !s.is_empty()).or(alias)
}

fn or_default(value: Option<String>, default: &str) -> String {
    value.unwrap_or_else(|| default.to_string())
}

#[derive(Debug, Default, Deserialize)]
pub struct RepresentRequest {
    pub img: Option<String>,
    pub img_path: Option<String>,
    pub model_name: Option<String>,
    pub detector_backend: Option<String>,
    pub enforce_detection: Option<bool>,
    pub align: Option<bool>,
    pub anti_spoofing: Option<bool>,
    pub max_faces: Option<i64>,
}

impl RepresentRequest {
    pub fn into_args(self) -> Result<RepresentArgs, MissingInput> {
        let img_path = pick_image(self.img, self.img_path).ok_or(MissingInput::Image)?;
        Ok(RepresentArgs {
            img_path,
            model_name: or_default(self.model_name, DEFAULT_MODEL_NAME),
            detector_backend: or_default(self.detector_backend, DEFAULT_DETECTOR_BACKEND),
            enforce_detection: self.enforce_detection.unwrap_or(true),
            align: self.align.unwrap_or(true),
            anti_spoofing: self.anti_spoofing.unwrap_or(false),
            max_faces: self.max_faces,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyRequest {
    pub img1: Option<String>,
    pub img1_path: Option<String>,
    pub img2: Option<String>,
    pub img2_path: Option<String>,
    pub model_name: Option<String>,
    pub detector_backend: Option<String>,
    pub distance_metric: Option<String>,
    pub align: Option<bool>,
    pub enforce_detection: Option<bool>,
    pub anti_spoofing: Option<bool>,
}

impl VerifyRequest {
    pub fn into_args(self) -> Result<VerifyArgs, MissingInput> {
        let img1_path = pick_image(self.img1, self.img1_path).ok_or(MissingInput::FirstImage)?;
        let img2_path = pick_image(self.img2, self.img2_path).ok_or(MissingInput::SecondImage)?;
        Ok(VerifyArgs {
            img1_path,
            img2_path,
            model_name: or_default(self.model_name, DEFAULT_MODEL_NAME),
            detector_backend: or_default(self.detector_backend, DEFAULT_DETECTOR_BACKEND),
            distance_metric: or_default(self.distance_metric, DEFAULT_DISTANCE_METRIC),
            align: self.align.unwrap_or(true),
            enforce_detection: self.enforce_detection.unwrap_or(true),
            anti_spoofing: self.anti_spoofing.unwrap_or(false),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    pub img: Option<String>,
    pub img_path: Option<String>,
    pub actions: Option<Vec<String>>,
    pub detector_backend: Option<String>,
    pub enforce_detection: Option<bool>,
    pub align: Option<bool>,
    pub anti_spoofing: Option<bool>,
}

impl AnalyzeRequest {
    pub fn into_args(self) -> Result<AnalyzeArgs, MissingInput> {
        let img_path = pick_image(self.img, self.img_path).ok_or(MissingInput::Image)?;
        Ok(AnalyzeArgs {
            img_path,
            actions: self
                .actions
                .unwrap_or_else(|| DEFAULT_ACTIONS.iter().map(ToString::to_string).collect()),
            detector_backend: or_default(self.detector_backend, DEFAULT_DETECTOR_BACKEND),
            enforce_detection: self.enforce_detection.unwrap_or(true),
            align: self.align.unwrap_or(true),
            anti_spoofing: self.anti_spoofing.unwrap_or(false),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct VerifyEmbeddingsRequest {
    pub embedding1: Option<Vec<f64>>,
    pub embedding2: Option<Vec<f64>>,
    pub distance_metric: Option<String>,
    pub model_name: Option<String>,
}

/// Two caller-supplied embeddings plus the comparison settings
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingPair {
    pub embedding1: Vec<f64>,
    pub embedding2: Vec<f64>,
    pub distance_metric: String,
    pub model_name: String,
}

impl VerifyEmbeddingsRequest {
    pub fn into_pair(self) -> Result<EmbeddingPair, MissingInput> {
        let embedding1 = self.embedding1.ok_or(MissingInput::FirstEmbedding)?;
        let embedding2 = self.embedding2.ok_or(MissingInput::SecondEmbedding)?;
        Ok(EmbeddingPair {
            embedding1,
            embedding2,
            distance_metric: or_default(self.distance_metric, DEFAULT_DISTANCE_METRIC),
            model_name: or_default(self.model_name, DEFAULT_MODEL_NAME),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode<T: DeserializeOwned>(json: &str) -> T {
        decode_body(json.as_bytes()).unwrap().unwrap()
    }

    #[test]
    fn test_absent_body() {
        assert!(decode_body::<RepresentRequest>(b"").unwrap().is_none());
        assert!(decode_body::<RepresentRequest>(b"  \n").unwrap().is_none());
        assert!(decode_body::<RepresentRequest>(b"null").unwrap().is_none());
        // An empty object is input, just without fields
        assert!(decode_body::<RepresentRequest>(b"{}").unwrap().is_some());
    }

    #[test]
    fn test_malformed_body() {
        assert!(decode_body::<RepresentRequest>(b"{not json").is_err());
        assert!(decode_body::<RepresentRequest>(b"[1, 2]").is_err());
        assert!(decode_body::<RepresentRequest>(br#"{"align": "yes"}"#).is_err());
    }

    #[test]
    fn test_represent_defaults() {
        let args = decode::<RepresentRequest>(r#"{"img": "a.jpg"}"#).into_args().unwrap();
        assert_eq!(
            args,
            RepresentArgs {
                img_path: "a.jpg".to_string(),
                model_name: "VGG-Face".to_string(),
                detector_backend: "opencv".to_string(),
                enforce_detection: true,
                align: true,
                anti_spoofing: false,
                max_faces: None,
            }
        );
    }

    #[test]
    fn test_represent_overrides_and_unknown_keys() {
        let args = decode::<RepresentRequest>(
            r#"{"img_path": "b.png", "model_name": "Facenet", "detector_backend": "retinaface",
                "enforce_detection": false, "align": false, "anti_spoofing": true,
                "max_faces": 2, "extra": [1, 2, 3]}"#,
        )
        .into_args()
        .unwrap();
        assert_eq!(args.img_path, "b.png");
        assert_eq!(args.model_name, "Facenet");
        assert_eq!(args.detector_backend, "retinaface");
        assert!(!args.enforce_detection);
        assert!(!args.align);
        assert!(args.anti_spoofing);
        assert_eq!(args.max_faces, Some(2));
    }

    #[test]
    fn test_max_faces_forwarded_unchanged() {
        // The backend decides what non-positive limits mean
        let args = decode::<RepresentRequest>(r#"{"img": "a.jpg", "max_faces": -1}"#)
            .into_args()
            .unwrap();
        assert_eq!(args.max_faces, Some(-1));

        let args = decode::<RepresentRequest>(r#"{"img": "a.jpg", "max_faces": 0}"#)
            .into_args()
            .unwrap();
        assert_eq!(args.max_faces, Some(0));
    }

    #[test]
    fn test_null_field_takes_default() {
        let args = decode::<RepresentRequest>(r#"{"img": "a.jpg", "model_name": null}"#)
            .into_args()
            .unwrap();
        assert_eq!(args.model_name, "VGG-Face");
    }

    #[test]
    fn test_image_alias_resolution() {
        assert_eq!(pick_image(Some("a".into()), Some("b".into())), Some("a".into()));
        assert_eq!(pick_image(None, Some("b".into())), Some("b".into()));
        assert_eq!(pick_image(Some(String::new()), Some("b".into())), Some("b".into()));
        assert_eq!(pick_image(Some(String::new()), None), None);
        assert_eq!(pick_image(None, None), None);
    }

    #[test]
    fn test_missing_images() {
        let err = decode::<RepresentRequest>("{}").into_args().unwrap_err();
        assert_eq!(err, MissingInput::Image);
        assert_eq!(err.to_string(), "you must pass img_path input");

        let err = decode::<VerifyRequest>(r#"{"img2": "b.jpg"}"#).into_args().unwrap_err();
        assert_eq!(err, MissingInput::FirstImage);

        let err = decode::<VerifyRequest>(r#"{"img1_path": "a.jpg"}"#).into_args().unwrap_err();
        assert_eq!(err, MissingInput::SecondImage);
        assert_eq!(err.to_string(), "you must pass img2_path input");
    }

    #[test]
    fn test_verify_defaults() {
        let args = decode::<VerifyRequest>(r#"{"img1": "a.jpg", "img2_path": "b.jpg"}"#)
            .into_args()
            .unwrap();
        assert_eq!(args.img1_path, "a.jpg");
        assert_eq!(args.img2_path, "b.jpg");
        assert_eq!(args.model_name, "VGG-Face");
        assert_eq!(args.detector_backend, "opencv");
        assert_eq!(args.distance_metric, "cosine");
        assert!(args.align);
        assert!(args.enforce_detection);
        assert!(!args.anti_spoofing);
    }

    #[test]
    fn test_analyze_default_actions() {
        let args = decode::<AnalyzeRequest>(r#"{"img": "face.jpg"}"#).into_args().unwrap();
        assert_eq!(args.actions, vec!["age", "gender", "emotion", "race"]);

        let args = decode::<AnalyzeRequest>(r#"{"img": "face.jpg", "actions": ["age"]}"#)
            .into_args()
            .unwrap();
        assert_eq!(args.actions, vec!["age"]);
    }

    #[test]
    fn test_embedding_pair() {
        let pair = decode::<VerifyEmbeddingsRequest>(r#"{"embedding1": [1, 0], "embedding2": [0.5, 0.5]}"#)
            .into_pair()
            .unwrap();
        assert_eq!(pair.embedding1, vec![1.0, 0.0]);
        assert_eq!(pair.distance_metric, "cosine");
        assert_eq!(pair.model_name, "VGG-Face");

        let err = decode::<VerifyEmbeddingsRequest>(r#"{"embedding2": [1]}"#)
            .into_pair()
            .unwrap_err();
        assert_eq!(err, MissingInput::FirstEmbedding);

        let err = decode::<VerifyEmbeddingsRequest>(r#"{"embedding1": []}"#)
            .into_pair()
            .unwrap_err();
        assert_eq!(err, MissingInput::SecondEmbedding);
    }
}
