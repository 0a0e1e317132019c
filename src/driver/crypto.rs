//! Payload encryption for the secure RTP stream.

use crypto_secretbox::{
    AeadInPlace,
    Error as CryptoError,
    Nonce,
    SecretBox,
    XSalsa20Poly1305 as Cipher,
};
use discortp::rtp::RtpPacket;

/// Number of bytes in the symmetric key delivered in the session description.
pub const KEY_SIZE: usize = SecretBox::<()>::KEY_SIZE;

/// Number of bytes in each packet's nonce.
pub const NONCE_SIZE: usize = SecretBox::<()>::NONCE_SIZE;

/// Number of bytes occupied by a packet's authentication tag.
pub const TAG_SIZE: usize = SecretBox::<()>::TAG_SIZE;

/// The sole encryption scheme offered during protocol negotiation.
pub const ENCRYPTION_MODE: &str = "xsalsa20_poly1305";

/// Derives a packet's nonce from its RTP header: the 12 header bytes in
/// positions `[0, 12)`, zeroes in `[12, 24)`.
pub(crate) fn header_nonce(header: &[u8]) -> Nonce {
    let mut nonce = Nonce::default();
    nonce[..RtpPacket::minimum_packet_size()].copy_from_slice(header);

    nonce
}

/// Encrypts `payload[..len]` in place, writing the 16-byte authentication
/// tag directly after the ciphertext.
///
/// Returns the combined `ciphertext ‖ tag` length.
pub(crate) fn encrypt_in_place(
    cipher: &Cipher,
    nonce: &Nonce,
    payload: &mut [u8],
    len: usize,
) -> Result<usize, CryptoError> {
    if payload.len() < len + TAG_SIZE {
        return Err(CryptoError);
    }

    let tag = cipher.encrypt_in_place_detached(nonce, b"", &mut payload[..len])?;
    payload[len..len + TAG_SIZE].copy_from_slice(&tag);

    Ok(len + TAG_SIZE)
}

#[cfg(test)]
mod test {
    use super::*;
    use crypto_secretbox::{KeyInit, Tag};

    #[test]
    fn nonce_is_header_then_zeroes() {
        let header: Vec<u8> = (1..=12).collect();
        let nonce = header_nonce(&header);

        assert_eq!(&nonce[..12], &header[..]);
        assert_eq!(&nonce[12..], &[0u8; 12]);
    }

    #[test]
    fn tag_follows_ciphertext_and_round_trips() {
        const TRUE_PAYLOAD: [u8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];

        let cipher = Cipher::new_from_slice(&[7u8; KEY_SIZE]).unwrap();
        let header = [9u8; 12];
        let nonce = header_nonce(&header);

        let mut buf = [0u8; TRUE_PAYLOAD.len() + TAG_SIZE];
        buf[..TRUE_PAYLOAD.len()].copy_from_slice(&TRUE_PAYLOAD);

        let total = encrypt_in_place(&cipher, &nonce, &mut buf[..], TRUE_PAYLOAD.len()).unwrap();
        assert_eq!(total, TRUE_PAYLOAD.len() + TAG_SIZE);

        // The peer detaches the trailing tag and recovers the plaintext.
        let (body, tag) = buf.split_at_mut(TRUE_PAYLOAD.len());
        let tag = Tag::clone_from_slice(tag);
        cipher
            .decrypt_in_place_detached(&nonce, b"", body, &tag)
            .unwrap();

        assert_eq!(body, &TRUE_PAYLOAD);
    }

    #[test]
    fn encryption_is_deterministic_in_key_and_nonce() {
        let cipher = Cipher::new_from_slice(&[3u8; KEY_SIZE]).unwrap();
        let nonce = header_nonce(&[5u8; 12]);

        let mut a = [11u8; 4 + TAG_SIZE];
        let mut b = [11u8; 4 + TAG_SIZE];
        encrypt_in_place(&cipher, &nonce, &mut a[..], 4).unwrap();
        encrypt_in_place(&cipher, &nonce, &mut b[..], 4).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn undersized_buffer_is_rejected() {
        let cipher = Cipher::new_from_slice(&[7u8; KEY_SIZE]).unwrap();
        let nonce = header_nonce(&[0u8; 12]);
        let mut buf = [0u8; 8];

        assert!(encrypt_in_place(&cipher, &nonce, &mut buf[..], 8).is_err());
    }

    #[test]
    fn short_keys_are_rejected() {
        assert!(Cipher::new_from_slice(&[1u8; KEY_SIZE - 1]).is_err());
    }
}
