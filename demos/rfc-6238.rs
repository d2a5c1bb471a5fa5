use otpauth_uri::{Algorithm, DescriptorBuilder};

fn main() {
    // secrets and timestamps from https://tools.ietf.org/html/rfc6238#appendix-B
    let secrets = [
        (Algorithm::SHA1, "12345678901234567890"),
        (Algorithm::SHA256, "12345678901234567890123456789012"),
        (
            Algorithm::SHA512,
            "1234567890123456789012345678901234567890123456789012345678901234",
        ),
    ];

    for (algorithm, secret) in secrets {
        let mut builder = DescriptorBuilder::default();
        builder.secret(secret.to_string());
        builder.algorithm(algorithm);
        builder.digits(8).unwrap();
        let descriptor = builder.build().unwrap();

        for time in [59, 1111111109, 1111111111, 1234567890, 2000000000, 20000000000] {
            println!("{}\t{:>11}\t{}", algorithm, time, descriptor.generate(time));
        }
    }
}
