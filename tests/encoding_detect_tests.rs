use curriculum_tool::encoding::{count_corruption, score_candidates};
use curriculum_tool::{CandidateEncoding, detect_and_decode};
use encoding_rs::{EUC_JP, SHIFT_JIS};

const SAMPLE: &str = "日付,曜日,時限,1年Aクラスの授業内容\n2025-09-30,火,1,解剖学\n";

#[test]
fn utf8_upload_is_decoded_as_utf8() {
    let decoded = detect_and_decode(SAMPLE.as_bytes()).expect("decodes");
    assert_eq!(decoded.encoding, CandidateEncoding::Utf8);
    assert_eq!(decoded.corruption, 0);
    assert_eq!(decoded.text, SAMPLE);
}

#[test]
fn shift_jis_upload_is_decoded_as_shift_jis() {
    let (bytes, _, had_errors) = SHIFT_JIS.encode(SAMPLE);
    assert!(!had_errors);

    let decoded = detect_and_decode(&bytes).expect("decodes");
    assert_eq!(decoded.encoding, CandidateEncoding::ShiftJis);
    assert_eq!(decoded.text, SAMPLE);
}

#[test]
fn euc_jp_candidate_decodes_cleanly() {
    let (bytes, _, _) = EUC_JP.encode(SAMPLE);
    let candidates = score_candidates(&bytes);
    let euc = candidates
        .iter()
        .find(|candidate| candidate.encoding == CandidateEncoding::EucJp)
        .expect("euc-jp candidate");
    assert_eq!(euc.corruption, 0);
    assert_eq!(euc.text, SAMPLE);
}

#[test]
fn ties_prefer_shift_jis() {
    let decoded = detect_and_decode(b"a,b\n1,2\n").expect("decodes");
    assert_eq!(decoded.encoding, CandidateEncoding::ShiftJis);
    assert_eq!(decoded.text, "a,b\n1,2\n");
}

#[test]
fn empty_input_is_a_decode_error() {
    let err = detect_and_decode(&[]).expect_err("nothing to decode");
    let message = err.to_string();
    assert!(message.contains("shift_jis"), "{message}");
    assert!(message.contains("euc-jp"), "{message}");
}

#[test]
fn control_characters_other_than_whitespace_count_as_corruption() {
    assert_eq!(count_corruption("a\tb\r\nc"), 0);
    assert_eq!(count_corruption("a\u{0000}b\u{000B}c\u{FFFD}"), 3);
}
