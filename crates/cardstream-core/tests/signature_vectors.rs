use cardstream_core::{
    Fields,
    signature::{MerchantSecret, canonical_string, sign, sign_fields, verify},
};

const SECRET: &str = "Circle4Take40Idea";

fn secret() -> MerchantSecret {
    MerchantSecret::new(SECRET).unwrap()
}

#[test]
fn sale_request_vector() {
    let fields = Fields::new()
        .with("merchantID", "100001")
        .with("action", "SALE")
        .with("type", "1")
        .with("amount", "1001")
        .with("currencyCode", "826")
        .with("countryCode", "826")
        .with("orderRef", "Test purchase #1")
        .with("transactionUnique", "abc123");

    assert_eq!(
        canonical_string(&fields),
        "action=SALE&amount=1001&countryCode=826&currencyCode=826&merchantID=100001\
         &orderRef=Test+purchase+%231&transactionUnique=abc123&type=1"
    );
    assert_eq!(
        sign(&fields, &secret()).as_str(),
        "d1ff520bcaa9bbdaea92cbd22b9a492880214c685e9bc54700e2217520d151bb\
         8a02470fd9a434a78fb81e80c626c150eaca8d14095bf60c75cdd473aa661640"
    );
}

#[test]
fn multiline_address_vector() {
    let fields = Fields::new()
        .with("responseCode", "0")
        .with("customerName", "Jane O'Doe & Co")
        .with("merchantID", "100001")
        .with("customerAddress", "16 Test Street,\r\nTestville,\nTS1 1ST");

    assert_eq!(
        sign(&fields, &secret()).as_str(),
        "4f66cc9da079406650628172d4e074b38ba5973ccc53154cab173de23c571c7c\
         97e3ced78439ac223d52aee49c10f6037b1df0d6f778c0f5743a950d9b8909ac"
    );
}

#[test]
fn nested_threeds_response_vector() {
    let fields = Fields::new()
        .with("merchantID", "100001")
        .with("action", "SALE")
        .with("threeDSRef", "REF*1")
        .with(
            "threeDSResponse",
            Fields::new()
                .with("threeDSMethodData", "eyJ0aHJlZURTU2VydmVyVHJhbnNJRCI6IjEyMyJ9")
                .with("cres", "Y"),
        );

    assert_eq!(
        sign(&fields, &secret()).as_str(),
        "7d8dd01de7422c8f6de7d31d302a9a438fe5496dc270749744dc4f12a20c6ea1\
         27b73daa8ddcd5372e3f50122f61f291d4bd6b5613a60b4e50aaca5f9782d28f"
    );
}

#[test]
fn top_level_order_does_not_matter() {
    let forward = Fields::new().with("a", "1").with("b", "2").with("c", "3");
    let backward = Fields::new().with("c", "3").with("b", "2").with("a", "1");

    assert_eq!(sign(&forward, &secret()), sign(&backward, &secret()));
}

#[test]
fn body_round_trip_verifies() {
    let signed = sign_fields(
        Fields::new()
            .with("responseCode", "0")
            .with("responseMessage", "AUTHCODE:123456")
            .with("xref", "20010100XX00XX00"),
        &secret(),
    );

    let received = Fields::parse(&signed.to_query());
    assert!(verify(&received, &secret()).is_ok());
    assert!(verify(&received, &MerchantSecret::new("other").unwrap()).is_err());
}
